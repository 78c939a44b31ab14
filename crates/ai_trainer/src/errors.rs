use profileguard_ai_core::AiCoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the training pipeline.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("no tabular dataset file found in {0}")]
    DataSource(PathBuf),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] AiCoreError),
}

impl TrainerError {
    /// Too few classes or members to split and train
    pub fn is_configuration(&self) -> bool {
        matches!(self, TrainerError::Core(AiCoreError::Configuration(_)))
    }
}

pub type Result<T> = std::result::Result<T, TrainerError>;
