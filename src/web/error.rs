//! HTTP error handling for the file server.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::render;
use crate::storage::StorageError;
use crate::FileShareError;

/// Error categories surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Payload too large (413).
    PayloadTooLarge,
    /// Internal server error (500).
    InternalError,
    /// Server is shutting down (503).
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Error returned by handlers, rendered as a small HTML page.
///
/// Unauthorized errors render the login form so the browser can recover.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message shown to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = match self.code {
            ErrorCode::Unauthorized => render::login_page(Some(&self.message)),
            _ => render::error_page(status, &self.message),
        };
        (status, Html(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FileShareError> for ApiError {
    fn from(err: FileShareError) -> Self {
        match &err {
            FileShareError::Unauthorized => ApiError::unauthorized("Login required"),
            FileShareError::InvalidCredentials => ApiError::unauthorized("Invalid password"),
            FileShareError::Forbidden(msg) => ApiError::forbidden(msg.clone()),
            FileShareError::NotFound(_) => ApiError::not_found(err.to_string()),
            FileShareError::Validation(msg) => ApiError::bad_request(msg.clone()),
            FileShareError::Storage(StorageError::NotFound(_)) => {
                tracing::warn!(error = %err, "Registered content is missing from storage");
                ApiError::not_found("File not found")
            }
            FileShareError::Storage(StorageError::InvalidName(_)) => {
                ApiError::bad_request(err.to_string())
            }
            FileShareError::Storage(StorageError::NotAContainer(_)) => {
                ApiError::forbidden("This folder does not accept uploads")
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        FileShareError::from(err).into()
    }
}
