//! Backend client error types.

use thiserror::Error;

/// Errors returned by backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the response could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Server returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The requested resource was not in the returned collection
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl ApiError {
    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
