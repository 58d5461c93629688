//! Foreman client errors

use thiserror::Error;

/// Errors that can occur when talking to the Foreman API
#[derive(Debug, Error)]
pub enum ForemanError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Foreman answered with a non-success status
    #[error("{message} (status {status})")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad credentials, missing permission)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g. malformed client configuration)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
