//! The annotated syntax tree handed to the validator.

use core::fmt;

/// Byte range within the parsed source, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

/// Type tag carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    VariableDeclaration,
    VariableDeclarator,
    ExpressionStatement,
    EmptyStatement,
    ObjectExpression,
    Property,
    ArrayExpression,
    Literal,
    Identifier,
    CallExpression,
    NewExpression,
    UnaryExpression,
    UpdateExpression,
    BinaryExpression,
    LogicalExpression,
    ConditionalExpression,
    AssignmentExpression,
    SequenceExpression,
    MemberExpression,
    ThisExpression,
    SpreadElement,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    RegExp {
        pattern: String,
        global: bool,
        multiline: bool,
        ignore_case: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Identifier(String),
    String(String),
    Number(f64),
    Computed(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub span: Span,
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Program(Vec<Node>),
    VariableDeclaration(Vec<Node>),
    VariableDeclarator {
        name: String,
        init: Option<Box<Node>>,
    },
    ExpressionStatement(Box<Node>),
    EmptyStatement,
    Object(Vec<Node>),
    Property {
        key: PropertyKey,
        value: Box<Node>,
        shorthand: bool,
    },
    Array(Vec<Option<Node>>),
    Literal(Literal),
    Identifier(String),
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    New {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    Unary {
        op: UnaryOp,
        argument: Box<Node>,
    },
    Update {
        op: &'static str,
        prefix: bool,
        argument: Box<Node>,
    },
    Binary {
        op: &'static str,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logical {
        op: &'static str,
        left: Box<Node>,
        right: Box<Node>,
    },
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    Assignment {
        op: &'static str,
        target: Box<Node>,
        value: Box<Node>,
    },
    Sequence(Vec<Node>),
    Member {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },
    This,
    Spread(Box<Node>),
}

impl Node {
    pub fn new(span: Span, data: NodeData) -> Self {
        Self { span, data }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Program(_) => NodeKind::Program,
            NodeData::VariableDeclaration(_) => NodeKind::VariableDeclaration,
            NodeData::VariableDeclarator { .. } => NodeKind::VariableDeclarator,
            NodeData::ExpressionStatement(_) => NodeKind::ExpressionStatement,
            NodeData::EmptyStatement => NodeKind::EmptyStatement,
            NodeData::Object(_) => NodeKind::ObjectExpression,
            NodeData::Property { .. } => NodeKind::Property,
            NodeData::Array(_) => NodeKind::ArrayExpression,
            NodeData::Literal(_) => NodeKind::Literal,
            NodeData::Identifier(_) => NodeKind::Identifier,
            NodeData::Call { .. } => NodeKind::CallExpression,
            NodeData::New { .. } => NodeKind::NewExpression,
            NodeData::Unary { .. } => NodeKind::UnaryExpression,
            NodeData::Update { .. } => NodeKind::UpdateExpression,
            NodeData::Binary { .. } => NodeKind::BinaryExpression,
            NodeData::Logical { .. } => NodeKind::LogicalExpression,
            NodeData::Conditional { .. } => NodeKind::ConditionalExpression,
            NodeData::Assignment { .. } => NodeKind::AssignmentExpression,
            NodeData::Sequence(_) => NodeKind::SequenceExpression,
            NodeData::Member { .. } => NodeKind::MemberExpression,
            NodeData::This => NodeKind::ThisExpression,
            NodeData::Spread(_) => NodeKind::SpreadElement,
        }
    }

    /// The identifier name, if this node is a bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.data {
            NodeData::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Direct child nodes in source order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.data {
            NodeData::Program(body) => body.iter().collect(),
            NodeData::VariableDeclaration(decls) => decls.iter().collect(),
            NodeData::VariableDeclarator { init, .. } => init.iter().map(|n| &**n).collect(),
            NodeData::ExpressionStatement(expr) | NodeData::Spread(expr) => vec![&**expr],
            NodeData::EmptyStatement
            | NodeData::Literal(_)
            | NodeData::Identifier(_)
            | NodeData::This => Vec::new(),
            NodeData::Object(props) => props.iter().collect(),
            NodeData::Property { key, value, .. } => match key {
                PropertyKey::Computed(k) => vec![&**k, &**value],
                _ => vec![&**value],
            },
            NodeData::Array(elements) => elements.iter().flatten().collect(),
            NodeData::Call { callee, arguments } | NodeData::New { callee, arguments } => {
                core::iter::once(&**callee).chain(arguments).collect()
            }
            NodeData::Unary { argument, .. } | NodeData::Update { argument, .. } => {
                vec![&**argument]
            }
            NodeData::Binary { left, right, .. } | NodeData::Logical { left, right, .. } => {
                vec![&**left, &**right]
            }
            NodeData::Conditional {
                test,
                consequent,
                alternate,
            } => vec![&**test, &**consequent, &**alternate],
            NodeData::Assignment { target, value, .. } => vec![&**target, &**value],
            NodeData::Sequence(exprs) => exprs.iter().collect(),
            NodeData::Member {
                object, property, ..
            } => vec![&**object, &**property],
        }
    }
}
