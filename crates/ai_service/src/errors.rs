//! Inference service error types

use profileguard_ai_core::AiCoreError;
use thiserror::Error;

/// Inference service errors
///
/// None of these cross the `predict` boundary; they are logged and turned
/// into the sentinel response.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    Request(String),

    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] AiCoreError),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Request(err.to_string())
    }
}

impl From<url::ParseError> for ServiceError {
    fn from(err: url::ParseError) -> Self {
        ServiceError::Request(format!("invalid URL: {err}"))
    }
}

/// Result type for inference operations
pub type Result<T> = std::result::Result<T, ServiceError>;
