//! The expression grammar provider: turns source text into an annotated
//! syntax tree, reporting (rather than stopping at) syntax errors.

mod ast;
mod lexer;
mod parser;

pub use ast::{Literal, Node, NodeData, NodeKind, PropertyKey, Span, UnaryOp};
pub use lexer::{is_identifier, is_reserved_word};
pub use parser::parse_program;

use crate::{Position, SourceLocation};

/// Name of the variable the user's text is assigned to.
pub const BINDING: &str = "__extjson__";

/// User text wrapped as the initializer of a variable declaration, with the
/// bookkeeping needed to report locations relative to the unwrapped text.
#[derive(Debug, Clone)]
pub struct WrappedSource {
    text: String,
    prefix_len: usize,
    lines: Vec<Line>,
}

// A line of the user text. `end` excludes the line terminator, and a line is
// `simple` when columns can be computed from byte offsets alone.
#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    end: usize,
    simple: bool,
}

fn index_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    for line in text.split('\n') {
        let content = line.strip_suffix('\r').unwrap_or(line);
        lines.push(Line {
            start,
            end: start + content.len(),
            simple: content.is_ascii() && !content.contains('\r'),
        });
        start += line.len() + 1;
    }
    lines
}

impl WrappedSource {
    pub fn new(user_text: &str) -> Self {
        let prefix = format!("var {} = ", BINDING);
        let prefix_len = prefix.len();
        Self {
            text: prefix + user_text,
            prefix_len,
            lines: index_lines(user_text),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn user_text(&self) -> &str {
        &self.text[self.prefix_len..]
    }

    /// The source text a node was parsed from.
    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or_default()
    }

    pub fn locate(&self, span: Span) -> SourceLocation {
        SourceLocation {
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }

    // Offsets inside the wrapper prefix clamp to the start of the user text.
    // Carriage returns do not count towards the column.
    fn position(&self, offset: usize) -> Position {
        let user = self.user_text();
        let rel = offset.saturating_sub(self.prefix_len).min(user.len());
        let index = self
            .lines
            .partition_point(|line| line.start <= rel)
            .saturating_sub(1);
        let line = match self.lines.get(index) {
            Some(line) => line,
            None => return Position::default(),
        };
        let column = if line.simple {
            rel.min(line.end) - line.start + 1
        } else {
            user.get(line.start..rel)
                .unwrap_or_default()
                .chars()
                .filter(|&c| c != '\r')
                .count()
                + 1
        };
        Position {
            line: index + 1,
            column,
            offset: rel,
        }
    }
}
