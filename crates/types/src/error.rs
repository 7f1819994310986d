// crates/types/src/error.rs
use thiserror::Error;

/// Errors surfaced by the backend call layer.
///
/// Every backend round trip resolves to either a typed payload or one of
/// these variants. Hooks never let them escape as panics — a failed fetch
/// lands in the cache entry's `error` field with prior data preserved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or rejected credentials. Disables hooks; never retried.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request payload. Surfaced immediately, no retry.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape.
    #[error("malformed payload: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify an HTTP status into the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            400 | 422 => Self::Validation(message),
            _ => Self::Server { status, message },
        }
    }

    /// Only transient failures are worth a retry. Auth and validation
    /// errors will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }
}
