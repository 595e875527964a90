//! Error types for the dispatch engine

use thiserror::Error;

/// Main error type for all dispatch operations
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Personalization failed: {0}")]
    Personalization(String),

    #[error("DNS error: {0}")]
    Dns(String),

    #[error("Continuation failed: {0}")]
    Continuation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl DispatchError {
    /// Errors the caller caused and can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::NotFound(_) | Self::InvalidTransition(_) | Self::Conflict(_)
        )
    }
}

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;
