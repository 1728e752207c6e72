use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a [`DbError`], for callers deciding whether to
/// retry, report a client error, or give up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The backend could not be reached.
    Connectivity,
    /// The request itself is invalid. Retrying will not help.
    Validation,
    /// A stored document could not be mapped back.
    Decode,
    /// The operation did not finish in time; its outcome is unknown.
    Timeout,
    /// Any other backend failure.
    Backend,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("collection {0:?} is not supported")]
    UnsupportedCollection(String),

    #[error("no connection has been opened")]
    NotOpened,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },

    #[error("cannot decode stored document: {0}")]
    Decode(String),

    #[error("store error: {0}")]
    Store(#[from] nativerw_store::StoreError),

    #[error("invalid value: {0}")]
    Type(#[from] nativerw_types::TypeError),

    #[error("hashing error: {0}")]
    Hasher(#[from] nativerw_crypto::HasherError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// Coarse class of the failure, for mapping to responses.
    pub fn category(&self) -> ErrorCategory {
        use nativerw_store::StoreError;

        match self {
            Self::NotOpened | Self::Unavailable(_) => ErrorCategory::Connectivity,
            Self::Store(StoreError::Unavailable(_)) => ErrorCategory::Connectivity,
            Self::UnsupportedCollection(_) | Self::Type(_) | Self::Config(_) => ErrorCategory::Validation,
            Self::Store(StoreError::UnsupportedContentType(_) | StoreError::InvalidContent { .. }) => {
                ErrorCategory::Validation
            }
            Self::Decode(_) | Self::Store(StoreError::CorruptDocument(_)) => ErrorCategory::Decode,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Store(_) | Self::Hasher(_) | Self::Io(_) => ErrorCategory::Backend,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
