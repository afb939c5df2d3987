//! Error-tolerant recursive descent parser producing an annotated tree.
//!
//! The parser understands a broad subset of JavaScript expressions and simple
//! statements. It is deliberately wider than extended JSON itself: anything it
//! can represent reaches the validator, which decides what is allowed. Syntax
//! errors are collected, and parsing resumes at the next statement boundary.

use super::ast::{Literal, Node, NodeData, PropertyKey, Span, UnaryOp};
use super::lexer::{Lexeme, Lexer, Token};
use crate::SyntaxError;

type PResult<T> = Result<T, (Span, SyntaxError)>;

const ASSIGNMENT_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

const UNSUPPORTED_STATEMENTS: &[&str] = &[
    "if", "for", "while", "do", "return", "switch", "try", "throw", "break", "continue", "with",
    "import", "export", "debugger",
];

/// Parses a whole program, returning the tree along with every syntax error
/// encountered. The tree is only meaningful when no errors were reported.
pub fn parse_program(src: &str, max_depth: usize) -> (Node, Vec<(Span, SyntaxError)>) {
    let mut parser = Parser::new(src, max_depth);
    let program = parser.parse_program();
    (program, parser.errors)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Lexeme,
    prev_end: usize,
    len: usize,
    depth: usize,
    max_depth: usize,
    errors: Vec<(Span, SyntaxError)>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, max_depth: usize) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(src),
            current: Lexeme {
                token: Token::Eof,
                span: Span::default(),
                newline_before: false,
            },
            prev_end: 0,
            len: src.len(),
            depth: 0,
            max_depth,
            errors: Vec::new(),
        };
        parser.advance();
        parser
    }

    // Moves to the next token. Lexing errors are recorded and the offending
    // characters skipped, so this always lands on a token (possibly `Eof`).
    fn advance(&mut self) {
        self.prev_end = self.current.span.end;
        loop {
            match self.lexer.next_token() {
                Ok(lexeme) => {
                    self.current = lexeme;
                    return;
                }
                Err(e) => self.errors.push(e),
            }
        }
    }

    fn is_punct(&self, p: &str) -> bool {
        self.current.token.is_punct(p)
    }

    fn is_name(&self, name: &str) -> bool {
        self.current.token.is_name(name)
    }

    fn unexpected<T>(&self) -> PResult<T> {
        let err = match &self.current.token {
            Token::Eof => SyntaxError::UnexpectedEof,
            token => SyntaxError::UnexpectedToken(token.describe()),
        };
        Err((self.current.span, err))
    }

    fn expect(&mut self, p: &str) -> PResult<()> {
        if self.is_punct(p) {
            self.advance();
            Ok(())
        } else {
            self.unexpected()
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    // Runs `f` one nesting level deeper. Every recursive path through the
    // grammar goes through here, which bounds stack use.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.max_depth {
            return Err((self.current.span, SyntaxError::NestingTooDeep(self.max_depth)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_program(&mut self) -> Node {
        let mut body = Vec::new();
        while self.current.token != Token::Eof {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(e) => {
                    let fatal = matches!(e.1, SyntaxError::NestingTooDeep(_));
                    self.errors.push(e);
                    if fatal {
                        break;
                    }
                    self.recover();
                }
            }
        }
        Node::new(Span::new(0, self.len), NodeData::Program(body))
    }

    // Skips to the start of the next statement, consuming at least one token.
    fn recover(&mut self) {
        loop {
            match &self.current.token {
                Token::Eof => return,
                Token::Punct(";") => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                    if self.current.newline_before {
                        return;
                    }
                }
            }
        }
    }

    fn consume_semicolon(&mut self) -> PResult<()> {
        if self.is_punct(";") {
            self.advance();
            return Ok(());
        }
        if self.current.token == Token::Eof || self.is_punct("}") || self.current.newline_before {
            return Ok(());
        }
        self.unexpected()
    }

    fn parse_statement(&mut self) -> PResult<Node> {
        let start = self.current.span.start;
        match &self.current.token {
            Token::Punct(";") => {
                self.advance();
                Ok(Node::new(self.span_from(start), NodeData::EmptyStatement))
            }
            Token::Name(n) if matches!(n.as_str(), "var" | "let" | "const") => {
                self.parse_variable_declaration()
            }
            Token::Name(n) if n == "function" => {
                Err((self.current.span, SyntaxError::Unsupported("functions")))
            }
            Token::Name(n) if n == "class" => {
                Err((self.current.span, SyntaxError::Unsupported("classes")))
            }
            Token::Name(n) if UNSUPPORTED_STATEMENTS.contains(&n.as_str()) => Err((
                self.current.span,
                SyntaxError::Unsupported("control statements"),
            )),
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Node::new(
                    self.span_from(start),
                    NodeData::ExpressionStatement(Box::new(expr)),
                ))
            }
        }
    }

    fn parse_variable_declaration(&mut self) -> PResult<Node> {
        let start = self.current.span.start;
        self.advance();
        let mut declarations = Vec::new();
        loop {
            let decl_start = self.current.span.start;
            let name = match &self.current.token {
                Token::Name(n) => n.clone(),
                _ => return self.unexpected(),
            };
            self.advance();
            let init = if self.is_punct("=") {
                self.advance();
                Some(Box::new(self.parse_assignment()?))
            } else {
                None
            };
            declarations.push(Node::new(
                self.span_from(decl_start),
                NodeData::VariableDeclarator { name, init },
            ));
            if self.is_punct(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.consume_semicolon()?;
        Ok(Node::new(
            self.span_from(start),
            NodeData::VariableDeclaration(declarations),
        ))
    }

    fn parse_expression(&mut self) -> PResult<Node> {
        let first = self.parse_assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let start = first.span.start;
        let mut exprs = vec![first];
        while self.is_punct(",") {
            self.advance();
            exprs.push(self.parse_assignment()?);
        }
        Ok(Node::new(self.span_from(start), NodeData::Sequence(exprs)))
    }

    fn parse_assignment(&mut self) -> PResult<Node> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> PResult<Node> {
        let target = self.parse_conditional()?;
        if self.is_punct("=>") {
            return Err((self.current.span, SyntaxError::Unsupported("arrow functions")));
        }
        let op = match &self.current.token {
            Token::Punct(p) => ASSIGNMENT_OPS.iter().find(|op| *op == p).copied(),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let value = self.parse_assignment()?;
                Ok(Node::new(
                    target.span.to(value.span),
                    NodeData::Assignment {
                        op,
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                ))
            }
            None => Ok(target),
        }
    }

    fn parse_conditional(&mut self) -> PResult<Node> {
        let test = self.parse_binary(0)?;
        if !self.is_punct("?") {
            return Ok(test);
        }
        self.advance();
        let consequent = self.parse_assignment()?;
        self.expect(":")?;
        let alternate = self.parse_assignment()?;
        Ok(Node::new(
            test.span.to(alternate.span),
            NodeData::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
        ))
    }

    // Precedence climbing over all binary and logical operators.
    fn parse_binary(&mut self, min_prec: u8) -> PResult<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let (op, prec) = match binary_op(&self.current.token) {
                Some((op, prec)) if prec >= min_prec => (op, prec),
                _ => break,
            };
            self.advance();
            // Exponentiation is right-associative.
            let next_min = if op == "**" { prec } else { prec + 1 };
            let right = self.nested(|p| p.parse_binary(next_min))?;
            let span = left.span.to(right.span);
            let (left_box, right_box) = (Box::new(left), Box::new(right));
            left = Node::new(
                span,
                if matches!(op, "&&" | "||" | "??") {
                    NodeData::Logical {
                        op,
                        left: left_box,
                        right: right_box,
                    }
                } else {
                    NodeData::Binary {
                        op,
                        left: left_box,
                        right: right_box,
                    }
                },
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Node> {
        let start = self.current.span.start;
        let op = match &self.current.token {
            Token::Punct("-") => Some(UnaryOp::Minus),
            Token::Punct("+") => Some(UnaryOp::Plus),
            Token::Punct("!") => Some(UnaryOp::Not),
            Token::Punct("~") => Some(UnaryOp::BitNot),
            Token::Name(n) if n == "typeof" => Some(UnaryOp::Typeof),
            Token::Name(n) if n == "void" => Some(UnaryOp::Void),
            Token::Name(n) if n == "delete" => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let argument = self.nested(Self::parse_unary)?;
            return Ok(Node::new(
                self.span_from(start),
                NodeData::Unary {
                    op,
                    argument: Box::new(argument),
                },
            ));
        }
        if let Token::Punct(op @ ("++" | "--")) = self.current.token {
            self.advance();
            let argument = self.nested(Self::parse_unary)?;
            return Ok(Node::new(
                self.span_from(start),
                NodeData::Update {
                    op,
                    prefix: true,
                    argument: Box::new(argument),
                },
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Node> {
        let expr = self.parse_call_member()?;
        if let Token::Punct(op @ ("++" | "--")) = self.current.token {
            if !self.current.newline_before {
                self.advance();
                return Ok(Node::new(
                    self.span_from(expr.span.start),
                    NodeData::Update {
                        op,
                        prefix: false,
                        argument: Box::new(expr),
                    },
                ));
            }
        }
        Ok(expr)
    }

    fn parse_call_member(&mut self) -> PResult<Node> {
        let mut expr = if self.is_name("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            let start = expr.span.start;
            if self.is_punct("(") {
                let arguments = self.parse_arguments()?;
                expr = Node::new(
                    self.span_from(start),
                    NodeData::Call {
                        callee: Box::new(expr),
                        arguments,
                    },
                );
            } else if self.is_punct("?.") {
                self.advance();
                if self.is_punct("(") {
                    let arguments = self.parse_arguments()?;
                    expr = Node::new(
                        self.span_from(start),
                        NodeData::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                    );
                } else {
                    expr = self.parse_member_tail(expr, true)?;
                }
            } else if self.is_punct(".") || self.is_punct("[") {
                expr = self.parse_member_tail(expr, false)?;
            } else {
                return Ok(expr);
            }
        }
    }

    // Parses `.name` or `[expr]` following `object`. `after_dot` is set when
    // the dot has already been consumed.
    fn parse_member_tail(&mut self, object: Node, after_dot: bool) -> PResult<Node> {
        let start = object.span.start;
        if !after_dot && self.is_punct(".") {
            self.advance();
        }
        let (property, computed) = if self.is_punct("[") {
            self.advance();
            let property = self.parse_expression()?;
            self.expect("]")?;
            (property, true)
        } else {
            match &self.current.token {
                Token::Name(n) => {
                    let node = Node::new(self.current.span, NodeData::Identifier(n.clone()));
                    self.advance();
                    (node, false)
                }
                _ => return self.unexpected(),
            }
        };
        Ok(Node::new(
            self.span_from(start),
            NodeData::Member {
                object: Box::new(object),
                property: Box::new(property),
                computed,
            },
        ))
    }

    fn parse_new(&mut self) -> PResult<Node> {
        let start = self.current.span.start;
        self.advance();
        if self.is_punct(".") {
            return Err((self.current.span, SyntaxError::Unsupported("meta properties")));
        }
        let mut callee = if self.is_name("new") {
            self.nested(Self::parse_new)?
        } else {
            self.parse_primary()?
        };
        while self.is_punct(".") || self.is_punct("[") {
            callee = self.parse_member_tail(callee, false)?;
        }
        let arguments = if self.is_punct("(") {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Node::new(
            self.span_from(start),
            NodeData::New {
                callee: Box::new(callee),
                arguments,
            },
        ))
    }

    fn parse_arguments(&mut self) -> PResult<Vec<Node>> {
        self.expect("(")?;
        let mut arguments = Vec::new();
        while !self.is_punct(")") {
            arguments.push(self.parse_element()?);
            if self.is_punct(",") {
                self.advance();
            } else if !self.is_punct(")") {
                return self.unexpected();
            }
        }
        self.advance();
        Ok(arguments)
    }

    // An assignment expression, or a spread element where those are allowed.
    fn parse_element(&mut self) -> PResult<Node> {
        if self.is_punct("...") {
            let start = self.current.span.start;
            self.advance();
            let argument = self.parse_assignment()?;
            return Ok(Node::new(
                self.span_from(start),
                NodeData::Spread(Box::new(argument)),
            ));
        }
        self.parse_assignment()
    }

    fn parse_primary(&mut self) -> PResult<Node> {
        let span = self.current.span;
        let data = match &self.current.token {
            Token::Number(n) => NodeData::Literal(Literal::Number(*n)),
            Token::String(s) => NodeData::Literal(Literal::String(s.clone())),
            Token::Name(n) => match n.as_str() {
                "null" => NodeData::Literal(Literal::Null),
                "true" => NodeData::Literal(Literal::Boolean(true)),
                "false" => NodeData::Literal(Literal::Boolean(false)),
                "this" => NodeData::This,
                "function" => return Err((span, SyntaxError::Unsupported("functions"))),
                "class" => return Err((span, SyntaxError::Unsupported("classes"))),
                "var" | "let" | "const" | "if" | "else" | "for" | "while" | "do" | "return"
                | "switch" | "case" | "default" | "try" | "catch" | "finally" | "throw"
                | "break" | "continue" | "with" | "in" | "instanceof" | "import" | "export" => {
                    return self.unexpected()
                }
                _ => NodeData::Identifier(n.clone()),
            },
            Token::Punct("(") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(")")?;
                return Ok(expr);
            }
            Token::Punct("[") => return self.parse_array(),
            Token::Punct("{") => return self.parse_object(),
            Token::Punct("/" | "/=") => {
                let lexeme = self
                    .lexer
                    .rescan_regex(span.start, self.current.newline_before)?;
                let data = match &lexeme.token {
                    Token::RegExp { pattern, flags } => NodeData::Literal(Literal::RegExp {
                        pattern: pattern.clone(),
                        global: flags.contains('g'),
                        multiline: flags.contains('m'),
                        ignore_case: flags.contains('i'),
                    }),
                    _ => return self.unexpected(),
                };
                self.current = lexeme;
                data
            }
            _ => return self.unexpected(),
        };
        let span = self.current.span;
        self.advance();
        Ok(Node::new(span, data))
    }

    fn parse_array(&mut self) -> PResult<Node> {
        let start = self.current.span.start;
        self.advance();
        let mut elements = Vec::new();
        loop {
            if self.is_punct("]") {
                break;
            }
            if self.is_punct(",") {
                // Hole, as in `[1,,2]`.
                self.advance();
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_element()?));
            if self.is_punct(",") {
                self.advance();
            } else if !self.is_punct("]") {
                return self.unexpected();
            }
        }
        self.advance();
        Ok(Node::new(self.span_from(start), NodeData::Array(elements)))
    }

    fn parse_object(&mut self) -> PResult<Node> {
        let start = self.current.span.start;
        self.advance();
        let mut properties = Vec::new();
        while !self.is_punct("}") {
            properties.push(self.parse_property()?);
            if self.is_punct(",") {
                self.advance();
            } else if !self.is_punct("}") {
                return self.unexpected();
            }
        }
        self.advance();
        Ok(Node::new(self.span_from(start), NodeData::Object(properties)))
    }

    fn parse_property(&mut self) -> PResult<Node> {
        let start = self.current.span.start;
        if self.is_punct("...") {
            return self.parse_element();
        }
        let key_span = self.current.span;
        let key = match &self.current.token {
            Token::Name(n) => PropertyKey::Identifier(n.clone()),
            Token::String(s) => PropertyKey::String(s.clone()),
            Token::Number(n) => PropertyKey::Number(*n),
            Token::Punct("[") => {
                self.advance();
                let key = self.parse_assignment()?;
                if !self.is_punct("]") {
                    return self.unexpected();
                }
                PropertyKey::Computed(Box::new(key))
            }
            _ => return self.unexpected(),
        };
        self.advance();

        if self.is_punct(":") {
            self.advance();
            let value = self.parse_assignment()?;
            return Ok(Node::new(
                self.span_from(start),
                NodeData::Property {
                    key,
                    value: Box::new(value),
                    shorthand: false,
                },
            ));
        }
        if self.is_punct("(") {
            return Err((self.current.span, SyntaxError::Unsupported("methods")));
        }
        match key {
            PropertyKey::Identifier(name) if self.is_punct(",") || self.is_punct("}") => {
                let value = Node::new(key_span, NodeData::Identifier(name.clone()));
                Ok(Node::new(
                    self.span_from(start),
                    NodeData::Property {
                        key: PropertyKey::Identifier(name),
                        value: Box::new(value),
                        shorthand: true,
                    },
                ))
            }
            _ => self.unexpected(),
        }
    }
}

fn binary_op(token: &Token) -> Option<(&'static str, u8)> {
    let op: &'static str = match token {
        Token::Punct(p) => *p,
        Token::Name(n) if n == "instanceof" => "instanceof",
        Token::Name(n) if n == "in" => "in",
        _ => return None,
    };
    let prec = match op {
        "??" => 1,
        "||" => 2,
        "&&" => 3,
        "|" => 4,
        "^" => 5,
        "&" => 6,
        "==" | "!=" | "===" | "!==" => 7,
        "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 8,
        "<<" | ">>" | ">>>" => 9,
        "+" | "-" => 10,
        "*" | "/" | "%" => 11,
        "**" => 12,
        _ => return None,
    };
    Some((op, prec))
}
