//! Errors produced while parsing extended JSON.

use core::fmt;

use thiserror::Error;

use crate::syntax::NodeKind;

/// A position within the text handed to [`crate::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    /// Byte offset into the parsed text.
    pub offset: usize,
}

impl Default for Position {
    fn default() -> Self {
        // Prefer human-readable locations.
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

/// The range of text an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Located<E> {
    pub location: SourceLocation,
    pub err: E,
}

impl<E> Located<E> {
    pub fn new(location: SourceLocation, err: E) -> Self {
        Self { location, err }
    }
}

impl<E: fmt::Display> fmt::Display for Located<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.err)
    }
}

/// Malformed token stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated regular expression")]
    UnterminatedRegex,
    #[error("invalid regular expression flags `{0}`")]
    InvalidRegexFlags(String),
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("{0} are not supported")]
    Unsupported(&'static str),
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// A well-formed syntax tree that is not allowed in extended JSON.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("unexpected statement {0}")]
    UnexpectedStatement(NodeKind),
    #[error("expecting VariableDeclaration but found {0}")]
    ExpectedDeclaration(NodeKind),
    #[error("unexpected variable declarations {0}")]
    UnexpectedDeclarations(usize),
    #[error("expected an object expression, found {0}")]
    ExpectedObject(NodeKind),
    #[error("bad call: {0}")]
    BadCall(String),
    #[error("unexpected value: {0}")]
    UnexpectedValue(String),
    #[error("unexpected {0}")]
    UnexpectedNode(NodeKind),
    #[error("computed property keys are not allowed")]
    ComputedKey,
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),
    #[error("invalid ISO date: {0:?}")]
    InvalidDate(String),
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// One error, flattened for display next to the offending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// The aggregate failure of a single parse. Never empty.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{}", summary(.0.len(), "syntax"))]
    Syntax(Vec<Located<SyntaxError>>),
    #[error("{}", summary(.0.len(), "parse"))]
    Structural(Vec<Located<StructuralError>>),
}

impl ParseError {
    /// The number of individual errors.
    pub fn len(&self) -> usize {
        match self {
            Self::Syntax(errs) => errs.len(),
            Self::Structural(errs) => errs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every error with its location, in source order of discovery.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        fn flatten<E: fmt::Display>(errs: &[Located<E>]) -> Vec<Diagnostic> {
            errs.iter()
                .map(|e| Diagnostic {
                    location: e.location,
                    message: e.err.to_string(),
                })
                .collect()
        }
        match self {
            Self::Syntax(errs) => flatten(errs),
            Self::Structural(errs) => flatten(errs),
        }
    }
}

fn summary(count: usize, what: &str) -> String {
    format!(
        "{} {} error{}",
        count,
        what,
        if count == 1 { "" } else { "s" }
    )
}
