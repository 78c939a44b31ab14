//! Error types for the AI Core module

use crate::serde_canon::CanonicalError;
use thiserror::Error;

/// Errors that can occur in the AI Core module
#[derive(Error, Debug)]
pub enum AiCoreError {
    /// Required column absent or feature arity mismatch
    #[error("Schema error: {0}")]
    Schema(String),

    /// Training input cannot produce a meaningful classifier
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or non-finite numeric value
    #[error("Numeric error: {0}")]
    Numeric(String),

    /// Persisted artifact pair is missing, incomplete, or fails verification
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Canonical encoding error
    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),
}

/// Result type for AI Core operations
pub type Result<T> = std::result::Result<T, AiCoreError>;
