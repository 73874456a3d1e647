//! Common error types for cloudferry.

use thiserror::Error;

/// Top-level error type for cloudferry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Network request failed or the host fetch rejected.
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials were rejected by the backend.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Backend refused access to the resource.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Remote configuration is missing or unusable.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
