//! Error types for the CMF server client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised before a server response could be obtained
///
/// Any HTTP status, including failures, is a response and is reported through
/// [`crate::TransportResponse`] instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection refused, reset, timeout, ...)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Check if this error was caused by a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestFailed(err) if err.is_timeout())
    }
}
