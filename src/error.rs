//! Error types for FileShare.

use std::net::SocketAddr;

use thiserror::Error;

use crate::storage::StorageError;

/// Common error type for FileShare.
#[derive(Error, Debug)]
pub enum FileShareError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Missing or invalid session.
    #[error("unauthorized")]
    Unauthorized,

    /// Action not permitted by the current access settings.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Wrong password, or no password configured.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Ingestion walked deeper than the configured limit.
    #[error("ingestion exceeded maximum depth of {0}")]
    IngestionTooDeep(usize),

    /// Storage collaborator failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for FileShareError {
    fn from(e: sqlx::Error) -> Self {
        FileShareError::Database(e.to_string())
    }
}

/// Result type alias for FileShare operations.
pub type Result<T> = std::result::Result<T, FileShareError>;
