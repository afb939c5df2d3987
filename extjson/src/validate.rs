//! Whitelist validation of the syntax tree, evaluating accepted nodes
//! straight into a [`CanonicalValue`].
//!
//! Nothing from the input is ever executed: every accepted node type has a
//! fixed, side-effect-free meaning, and everything else is reported.

use std::collections::HashSet;

use log::{debug, trace};

use crate::literal::{self, Constructor};
use crate::number::to_js_string;
use crate::syntax::{Literal, Node, NodeData, NodeKind, PropertyKey, Span, WrappedSource};
use crate::value::{CanonicalValue, ExtendedType, Map};
use crate::{Located, StructuralError};

pub type ValidationResult = Result<CanonicalValue, Vec<Located<StructuralError>>>;

/// Checks that `program` is exactly `var <name> = { ... }` and returns the
/// value of the object literal.
pub fn validate(source: &WrappedSource, program: &Node, max_depth: usize) -> ValidationResult {
    let mut validator = Validator::new(source, max_depth);
    let init = match validator.check_shape(program) {
        Some(init) if validator.errors.is_empty() => init,
        _ => return Err(validator.errors),
    };
    let value = validator.visit(init, 1);
    match value {
        Some(value) if validator.errors.is_empty() => Ok(value),
        _ => {
            debug!("Rejected input with {} error(s)", validator.errors.len());
            Err(validator.errors)
        }
    }
}

struct Validator<'a> {
    source: &'a WrappedSource,
    max_depth: usize,
    errors: Vec<Located<StructuralError>>,
    // Nodes that already carry an error.
    flagged: HashSet<(Span, NodeKind)>,
}

impl<'a> Validator<'a> {
    fn new(source: &'a WrappedSource, max_depth: usize) -> Self {
        Self {
            source,
            max_depth,
            errors: Vec::new(),
            flagged: HashSet::new(),
        }
    }

    fn error(&mut self, node: &Node, err: StructuralError) {
        if self.flagged.insert((node.span, node.kind())) {
            trace!("Rejecting {} at {:?}: {}", node.kind(), node.span, err);
            self.errors
                .push(Located::new(self.source.locate(node.span), err));
        }
    }

    // Program -> VariableDeclaration -> single declarator -> object initializer.
    fn check_shape<'n>(&mut self, program: &'n Node) -> Option<&'n Node> {
        let body = match &program.data {
            NodeData::Program(body) => body,
            _ => {
                self.error(program, StructuralError::UnexpectedNode(program.kind()));
                return None;
            }
        };
        if let Some(extra) = body.get(1) {
            self.error(extra, StructuralError::UnexpectedStatement(extra.kind()));
        }
        let statement = match body.first() {
            Some(statement) => statement,
            None => {
                self.error(program, StructuralError::ExpectedDeclaration(NodeKind::Program));
                return None;
            }
        };
        let declarations = match &statement.data {
            NodeData::VariableDeclaration(declarations) => declarations,
            _ => {
                self.error(
                    statement,
                    StructuralError::ExpectedDeclaration(statement.kind()),
                );
                return None;
            }
        };
        if let Some(extra) = declarations.get(1) {
            self.error(
                extra,
                StructuralError::UnexpectedDeclarations(declarations.len()),
            );
        }
        let declarator = declarations.first()?;
        let init = match &declarator.data {
            NodeData::VariableDeclarator {
                init: Some(init), ..
            } => &**init,
            _ => {
                self.error(
                    declarator,
                    StructuralError::ExpectedObject(declarator.kind()),
                );
                return None;
            }
        };
        if !matches!(init.data, NodeData::Object(_)) {
            self.error(init, StructuralError::ExpectedObject(init.kind()));
            return None;
        }
        Some(init)
    }

    // Evaluates an accepted node. Returns `None` when the node or anything
    // beneath it was rejected.
    fn visit(&mut self, node: &Node, depth: usize) -> Option<CanonicalValue> {
        if depth > self.max_depth {
            self.error(node, StructuralError::NestingTooDeep(self.max_depth));
            return None;
        }
        match &node.data {
            NodeData::Literal(lit) => Some(match lit {
                Literal::Null => CanonicalValue::Null,
                Literal::Boolean(b) => CanonicalValue::Bool(*b),
                Literal::Number(n) => CanonicalValue::Number(*n),
                Literal::String(s) => CanonicalValue::String(s.clone()),
                Literal::RegExp {
                    pattern,
                    global,
                    multiline,
                    ignore_case,
                } => literal::regex_literal(pattern, *global, *multiline, *ignore_case),
            }),
            NodeData::Identifier(name) => match identifier(name) {
                Some(value) => Some(value),
                None => {
                    self.error(node, StructuralError::UnknownIdentifier(name.clone()));
                    None
                }
            },
            NodeData::Array(elements) => {
                let mut values = Some(Vec::with_capacity(elements.len()));
                for element in elements {
                    let value = match element {
                        Some(element) => self.visit(element, depth + 1),
                        None => Some(CanonicalValue::Null),
                    };
                    values = values.zip(value).map(|(mut values, value)| {
                        values.push(value);
                        values
                    });
                }
                values.map(CanonicalValue::Array)
            }
            NodeData::Object(properties) => {
                let mut members = Some(Map::new());
                for property in properties {
                    let member = self.visit_property(property, depth);
                    members = members.zip(member).map(|(mut members, (key, value))| {
                        // Later duplicates win, keeping the first key's position.
                        members.insert(key, value);
                        members
                    });
                }
                members.map(CanonicalValue::Object)
            }
            NodeData::Unary { op, argument } => self
                .visit(argument, depth + 1)
                .map(|operand| literal::unary(*op, operand)),
            NodeData::Call { callee, arguments } | NodeData::New { callee, arguments } => {
                self.visit_call(node, callee, arguments, depth)
            }
            _ => {
                self.reject(node, StructuralError::UnexpectedNode(node.kind()), depth);
                None
            }
        }
    }

    fn visit_property(&mut self, node: &Node, depth: usize) -> Option<(String, CanonicalValue)> {
        let (key, value) = match &node.data {
            NodeData::Property { key, value, .. } => (key, value),
            _ => {
                self.reject(node, StructuralError::UnexpectedNode(node.kind()), depth);
                return None;
            }
        };
        let key = match key {
            PropertyKey::Identifier(k) | PropertyKey::String(k) => Some(k.clone()),
            PropertyKey::Number(n) => Some(to_js_string(*n)),
            PropertyKey::Computed(expr) => {
                self.reject(expr, StructuralError::ComputedKey, depth);
                None
            }
        };

        let value = match (&value.data, value.as_identifier()) {
            (_, Some("NaN")) => Some(ExtendedType::NaNMarker.into()),
            (
                NodeData::Literal(_)
                | NodeData::Object(_)
                | NodeData::Array(_)
                | NodeData::Call { .. }
                | NodeData::New { .. }
                | NodeData::Unary { .. },
                _,
            ) => self.visit(value, depth + 1),
            _ => {
                let text = self.source.slice(value.span).to_string();
                self.reject(value, StructuralError::UnexpectedValue(text), depth);
                None
            }
        };
        key.zip(value)
    }

    fn visit_call(
        &mut self,
        node: &Node,
        callee: &Node,
        arguments: &[Node],
        depth: usize,
    ) -> Option<CanonicalValue> {
        let mut args = Some(Vec::with_capacity(arguments.len()));
        for argument in arguments {
            let value = match argument.data {
                NodeData::Spread(_) => {
                    self.reject(
                        argument,
                        StructuralError::UnexpectedNode(argument.kind()),
                        depth,
                    );
                    None
                }
                _ => self.visit(argument, depth + 1),
            };
            args = args.zip(value).map(|(mut args, value)| {
                args.push(value);
                args
            });
        }

        let constructor = match callee.as_identifier() {
            Some(name) => match Constructor::from_name(name) {
                Some(constructor) => constructor,
                None => {
                    self.error(node, StructuralError::BadCall(name.to_string()));
                    return None;
                }
            },
            None => {
                let text = self.source.slice(callee.span).to_string();
                self.error(node, StructuralError::BadCall(text));
                self.reject(
                    callee,
                    StructuralError::UnexpectedNode(callee.kind()),
                    depth,
                );
                return None;
            }
        };

        match constructor.construct(args?) {
            Ok(value) => Some(value),
            Err(err) => {
                self.error(node, err);
                None
            }
        }
    }

    // Reports `node` and keeps looking for further problems beneath it.
    // Bare identifiers under a rejected node are not reported on their own.
    fn reject(&mut self, node: &Node, err: StructuralError, depth: usize) {
        self.error(node, err);
        for child in node.children() {
            if child.as_identifier().is_none() {
                self.visit(child, depth + 1);
            }
        }
    }
}

/// The global names a bare identifier may refer to.
fn identifier(name: &str) -> Option<CanonicalValue> {
    match name {
        "NaN" => Some(ExtendedType::NaNMarker.into()),
        "Infinity" => Some(CanonicalValue::Number(f64::INFINITY)),
        "undefined" => Some(CanonicalValue::Null),
        _ => None,
    }
}
