//! Resolution errors
//!
//! Every stage of resolution reports through [`ResolveError`]. Resolution
//! stops at the first error; a partially resolved document is never returned.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Anchor '{0}' is defined more than once")]
    DuplicateAnchor(String),

    #[error("Unknown anchor: {0}")]
    UnknownAnchor(String),

    #[error("Unresolved reference to anchor '{name}' at {path}")]
    UnresolvedReference { name: String, path: String },

    #[error("Cyclic anchor reference: {}", .0.join(" -> "))]
    CyclicReference(Vec<String>),

    #[error("Invalid recipe at {path}: {message}")]
    Schema { path: String, message: String },

    #[error("Invalid YAML: {0}")]
    Yaml(String),

    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl ResolveError {
    /// Shorthand for a schema violation at `path`
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::Schema {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a required field that is absent or null
    pub fn missing(path: impl Into<String>) -> Self {
        Self::schema(path, "required field is missing")
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::DuplicateAnchor(_) => "duplicate_anchor",
            ResolveError::UnknownAnchor(_) => "unknown_anchor",
            ResolveError::UnresolvedReference { .. } => "unresolved_reference",
            ResolveError::CyclicReference(_) => "cyclic_reference",
            ResolveError::Schema { .. } => "schema",
            ResolveError::Yaml(_) => "yaml",
            ResolveError::Syntax { .. } => "syntax",
        }
    }
}
