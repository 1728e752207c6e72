/// Errors from backend and codec operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A write would violate a unique index.
    #[error("duplicate key in {collection}: violates unique index {index}")]
    DuplicateKey { collection: String, index: String },

    /// No codec is registered for the content type.
    #[error("unsupported content-type {0:?}: no mapping implementation")]
    UnsupportedContentType(String),

    /// A payload could not be decoded or does not fit its codec.
    #[error("invalid {content_type} content: {reason}")]
    InvalidContent { content_type: String, reason: String },

    /// A stored value has an unexpected shape.
    #[error("corrupt document: {0}")]
    CorruptDocument(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for failures that may clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
