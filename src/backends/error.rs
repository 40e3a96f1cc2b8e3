//! Backend store error types

use thiserror::Error;

/// Errors raised by a backend store while talking to its native client
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the backend
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Failed to serialize or deserialize a stored value
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Native command failed; the driver's own text is preserved
    #[error("backend error: {0}")]
    BackendError(String),

    /// Filesystem failure for file-based stores
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend has no native primitive for the requested call
    #[error("unsupported by backend: {0}")]
    Unsupported(String),

    /// The store was built from invalid connection parameters
    #[error("invalid backend configuration: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::BackendError(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
