//! ProfileGuard AI Trainer - offline training pipeline
//!
//! Reads a labelled profile dataset, fits the scaler and the bagged-tree
//! ensemble on a stratified training partition, evaluates on the held-out
//! partition and writes the artifact pair.

pub mod config;
pub mod dataset;
pub mod errors;
pub mod split;
pub mod trainer;

use std::path::Path;

pub use config::TrainingParams;
pub use dataset::{DatasetPreparer, PreparedDataset, RawTable};
pub use errors::TrainerError;
pub use split::StratifiedSplit;
pub use trainer::{EvaluationReport, PipelineStage, TrainingPipeline, TrainingReport};

/// Train from the first CSV file in `data_dir` and write the pair to `output_dir`.
pub fn train_from_dir(
    data_dir: &Path,
    output_dir: &Path,
    params: TrainingParams,
) -> Result<TrainingReport, TrainerError> {
    let preparer = DatasetPreparer::new(data_dir);
    TrainingPipeline::new(params).run(&preparer, output_dir)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
