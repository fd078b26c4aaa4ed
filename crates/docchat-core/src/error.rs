//! Failure taxonomy for backend calls.

use thiserror::Error;

/// Errors surfaced by [`crate::ApiClient`]. Callers are expected to absorb
/// these into a visible message rather than propagate them further.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// No response reached the client (connection refused, DNS, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The client-side deadline elapsed before the backend answered.
    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-2xx status.
    #[error("server returned HTTP {status}")]
    Server { status: u16 },

    /// A 2xx response whose body did not match the expected shape.
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if let Some(status) = err.status() {
            ClientError::Server { status: status.as_u16() }
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
