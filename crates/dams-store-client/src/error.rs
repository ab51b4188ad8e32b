//! Error types for the store client

use thiserror::Error;

/// Store client error
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed (connection refused, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-2xx status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A default header could not be built from the configured name/value
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl StoreError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Server { status, .. } => Some(*status),
            StoreError::NotFound(_) => Some(404),
            StoreError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
