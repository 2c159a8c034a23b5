use thiserror::Error;

/// Errors that can occur against the object-storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The provided content hash is not a valid SHA-256 hex string.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// The object exceeds the configured size limit.
    #[error("object exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// A signing or network failure against the backend.
    #[error("storage backend error: {0}")]
    Backend(String),
}
