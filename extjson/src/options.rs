//! Parser configuration.

use serde::{Deserialize, Serialize};

/// The default bound on how deeply values may nest.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Options accepted by [`crate::parse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum nesting of arrays, objects, calls and unary operators.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    /// Convenience method for overriding the nesting bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
