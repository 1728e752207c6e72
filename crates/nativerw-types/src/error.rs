use thiserror::Error;

/// Errors produced when parsing or validating foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid resource identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid content-revision {0:?}")]
    InvalidRevision(String),

    #[error("invalid media type {0:?}")]
    InvalidMediaType(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
