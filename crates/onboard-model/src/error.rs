//! Error types for schema validation.

use thiserror::Error;

/// Errors raised when validating descriptors loaded from a schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    /// A descriptor has an empty or whitespace-only name.
    #[error("{kind} at position {position} has an empty name")]
    EmptyName {
        /// "field" or "column".
        kind: &'static str,
        /// Zero-based position in the schema.
        position: usize,
    },

    /// Two descriptors share the same name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// "field" or "column".
        kind: &'static str,
        /// The repeated name.
        name: String,
    },
}

impl ModelError {
    /// Get the offending name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::DuplicateName { name, .. } => Some(name),
            Self::EmptyName { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
