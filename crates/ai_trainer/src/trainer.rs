//! Offline training pipeline
//!
//! One linear run: prepare the dataset, split it stratified by label,
//! fit the scaler on the training partition, fit the ensemble, evaluate
//! on the held-out partition and persist the artifact pair. Any failure
//! aborts the run before anything is written.

use std::fmt;
use std::path::Path;

use profileguard_ai_core::{
    ArtifactManifest, ArtifactPair, EnsembleClassifier, FeatureSchema, Label, StandardScaler,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TrainingParams;
use crate::dataset::{DatasetPreparer, PreparedDataset};
use crate::errors::Result;
use crate::split::StratifiedSplit;

/// Pipeline progress; stages only move forward
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineStage {
    Idle,
    Prepared,
    Split,
    ScalerFitted,
    ModelFitted,
    Evaluated,
    Persisted,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Held-out evaluation with Fake as the positive class
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl EvaluationReport {
    pub fn from_predictions(truth: &[Label], predicted: &[Label]) -> Self {
        let mut report = Self::default();
        for (&actual, &guess) in truth.iter().zip(predicted) {
            match (actual, guess) {
                (Label::Fake, Label::Fake) => report.true_positive += 1,
                (Label::Real, Label::Fake) => report.false_positive += 1,
                (Label::Real, Label::Real) => report.true_negative += 1,
                (Label::Fake, Label::Real) => report.false_negative += 1,
            }
        }
        let total = report.total();
        if total > 0 {
            report.accuracy = (report.true_positive + report.true_negative) as f64 / total as f64;
        }
        report
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    /// Rows per true class, indexed by `Label::index`
    pub fn support(&self) -> [usize; 2] {
        [
            self.true_negative + self.false_positive,
            self.true_positive + self.false_negative,
        ]
    }
}

/// Fitted pair plus its held-out evaluation, not yet persisted
#[derive(Clone, Debug)]
pub struct TrainedModel {
    pub pair: ArtifactPair,
    pub evaluation: EvaluationReport,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Summary of a completed run
#[derive(Clone, Debug, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub skipped_rows: usize,
    pub evaluation: EvaluationReport,
    pub manifest: ArtifactManifest,
}

/// Drives one training run through its stages
#[derive(Debug)]
pub struct TrainingPipeline {
    params: TrainingParams,
    stage: PipelineStage,
}

impl TrainingPipeline {
    pub fn new(params: TrainingParams) -> Self {
        Self {
            params,
            stage: PipelineStage::Idle,
        }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn advance(&mut self, stage: PipelineStage) {
        debug_assert!(stage > self.stage);
        info!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }

    /// Read the dataset directory, train, and write the pair to `output_dir`
    pub fn run(
        &mut self,
        preparer: &DatasetPreparer,
        output_dir: &Path,
    ) -> Result<TrainingReport> {
        self.params.validate()?;

        let dataset = preparer.load()?;
        let trained = self.fit(&dataset)?;
        let manifest = self.persist(&trained, output_dir)?;

        Ok(TrainingReport {
            rows: dataset.len(),
            train_rows: trained.train_rows,
            test_rows: trained.test_rows,
            skipped_rows: dataset.skipped_rows,
            evaluation: trained.evaluation,
            manifest,
        })
    }

    /// Split, scale, fit and evaluate without touching the filesystem
    pub fn fit(&mut self, dataset: &PreparedDataset) -> Result<TrainedModel> {
        self.params.validate()?;
        self.stage = PipelineStage::Idle;
        self.advance(PipelineStage::Prepared);

        let split = StratifiedSplit::new(
            &dataset.labels,
            self.params.test_fraction,
            self.params.seed,
        )?;
        let train_x = StratifiedSplit::select(&dataset.features, &split.train);
        let train_y = StratifiedSplit::select(&dataset.labels, &split.train);
        let test_x = StratifiedSplit::select(&dataset.features, &split.test);
        let test_y = StratifiedSplit::select(&dataset.labels, &split.test);
        info!(train = train_x.len(), test = test_x.len(), "stratified split");
        self.advance(PipelineStage::Split);

        let scaler = StandardScaler::fit(&train_x)?;
        let train_scaled = scaler.transform(&train_x)?;
        let test_scaled = scaler.transform(&test_x)?;
        for (i, (mean, std)) in scaler.mean.iter().zip(&scaler.std).enumerate() {
            debug!(feature = i, mean, std, "scaler column");
        }
        self.advance(PipelineStage::ScalerFitted);

        let forest_config = self.params.forest_config();
        info!(
            trees = forest_config.tree_count,
            max_depth = forest_config.max_depth,
            seed = forest_config.seed,
            class_weight = ?forest_config.class_weight,
            "fitting ensemble"
        );
        let model = EnsembleClassifier::fit(&train_scaled, &train_y, forest_config)?;
        self.advance(PipelineStage::ModelFitted);

        let predicted = model.predict_batch(&test_scaled)?;
        let evaluation = EvaluationReport::from_predictions(&test_y, &predicted);
        info!(
            accuracy = evaluation.accuracy,
            tp = evaluation.true_positive,
            fp = evaluation.false_positive,
            tn = evaluation.true_negative,
            fn_ = evaluation.false_negative,
            "held-out evaluation"
        );
        self.advance(PipelineStage::Evaluated);

        Ok(TrainedModel {
            pair: ArtifactPair::new(FeatureSchema::Training, scaler, model)?,
            evaluation,
            train_rows: train_x.len(),
            test_rows: test_x.len(),
        })
    }

    /// Write the pair atomically; the previous pair stays intact on failure
    pub fn persist(
        &mut self,
        trained: &TrainedModel,
        output_dir: &Path,
    ) -> Result<ArtifactManifest> {
        let manifest = trained
            .pair
            .save_atomic(output_dir, Some(trained.evaluation.accuracy))?;
        self.advance(PipelineStage::Persisted);
        Ok(manifest)
    }
}
