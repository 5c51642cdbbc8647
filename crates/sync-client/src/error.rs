//! Error types for sync-client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response
    #[error("HTTP error: {0}")]
    Http(String),

    /// No response within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The entity is not in the local cache
    #[error("{0}")]
    NotFound(String),
}

impl ClientError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// The server no longer has the entity the request named.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
