//! Bagged decision-tree ensemble
//!
//! Each tree is grown on a bootstrap resample of the training rows with
//! its own seed derived from the ensemble seed and the tree index, so a
//! fixed seed reproduces the ensemble exactly.

use super::builder::{CartBuilder, TreeConfig};
use super::tree::Tree;
use crate::deterministic::{xxhash64_i64, LcgRng};
use crate::errors::{AiCoreError, Result};
use crate::features::{Label, NUM_CLASSES};
use crate::serde_canon::{hash_canonical_hex, to_canonical_json};
use serde::{Deserialize, Serialize};

/// Serialized ensemble format version
pub const FORMAT_VERSION: i32 = 1;

/// Per-class sample weighting used during split evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every row counts once
    #[default]
    Uniform,
    /// Weights inversely proportional to class frequency
    Balanced,
}

/// Ensemble hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub tree_count: usize,
    pub max_depth: usize,
    pub seed: i64,
    pub class_weight: ClassWeight,
    pub min_samples_split: usize,
    /// Features tried per split; `None` means floor(sqrt(n_features))
    pub max_features: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            tree_count: 300,
            max_depth: 15,
            seed: 42,
            class_weight: ClassWeight::Balanced,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

impl ForestConfig {
    fn validate(&self) -> Result<()> {
        if self.tree_count == 0 {
            return Err(AiCoreError::Configuration(
                "tree_count must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(AiCoreError::Configuration(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(AiCoreError::Configuration(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(AiCoreError::Configuration(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved feature-subset size for a given input width
    pub fn features_per_split(&self, n_features: usize) -> usize {
        let default = (n_features as f64).sqrt().floor() as usize;
        self.max_features.unwrap_or(default).clamp(1, n_features.max(1))
    }
}

/// Class weights for the given labels under `mode`
pub fn class_weights(labels: &[Label], mode: ClassWeight) -> [f64; NUM_CLASSES] {
    match mode {
        ClassWeight::Uniform => [1.0; NUM_CLASSES],
        ClassWeight::Balanced => {
            let mut counts = [0usize; NUM_CLASSES];
            for label in labels {
                counts[label.index()] += 1;
            }
            let present = counts.iter().filter(|&&c| c > 0).count().max(1);
            let mut weights = [0.0; NUM_CLASSES];
            for (weight, &count) in weights.iter_mut().zip(&counts) {
                if count > 0 {
                    *weight = labels.len() as f64 / (present * count) as f64;
                }
            }
            weights
        }
    }
}

/// Bagged classification-tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleClassifier {
    /// Model format version
    pub version: i32,
    /// Hyperparameters used to build the trees
    pub config: ForestConfig,
    /// Input width every row must match
    pub n_features: usize,
    /// Class weights applied during training
    pub class_weights: [f64; NUM_CLASSES],
    /// Trees in build order
    pub trees: Vec<Tree>,
}

impl EnsembleClassifier {
    /// Fit `config.tree_count` trees on standardized rows
    pub fn fit(features: &[Vec<f64>], labels: &[Label], config: ForestConfig) -> Result<Self> {
        config.validate()?;

        if features.len() != labels.len() {
            return Err(AiCoreError::Schema(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        let Some(first) = features.first() else {
            return Err(AiCoreError::Configuration(
                "cannot train on an empty dataset".to_string(),
            ));
        };
        let n_features = first.len();
        if n_features == 0 {
            return Err(AiCoreError::Schema("training rows have no features".to_string()));
        }
        for (row_idx, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(AiCoreError::Schema(format!(
                    "row {} has {} features, expected {}",
                    row_idx,
                    row.len(),
                    n_features
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(AiCoreError::Numeric(format!(
                    "row {row_idx} contains a non-finite value"
                )));
            }
        }

        let distinct = [Label::Real, Label::Fake]
            .iter()
            .filter(|class| labels.contains(class))
            .count();
        if distinct < 2 {
            return Err(AiCoreError::Configuration(format!(
                "training labels contain {distinct} distinct class(es); need 2"
            )));
        }

        let weights = class_weights(labels, config.class_weight);
        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            max_features: config.features_per_split(n_features),
        };
        let n_rows = features.len();

        let mut trees = Vec::with_capacity(config.tree_count);
        for tree_idx in 0..config.tree_count {
            let mut rng = LcgRng::new(xxhash64_i64(&[tree_idx as i64], config.seed));
            let sample: Vec<usize> = (0..n_rows).map(|_| rng.next_index(n_rows)).collect();

            let tree = CartBuilder::new(features, labels, weights, tree_config.clone(), rng)
                .build(&sample);
            tracing::debug!(
                tree = tree_idx + 1,
                of = config.tree_count,
                nodes = tree.nodes.len(),
                depth = tree.depth(),
                "tree grown"
            );
            trees.push(tree);
        }

        Ok(Self {
            version: FORMAT_VERSION,
            config,
            n_features,
            class_weights: weights,
            trees,
        })
    }

    /// Per-class vote counts for one standardized row
    pub fn votes(&self, row: &[f64]) -> Result<[usize; NUM_CLASSES]> {
        if row.len() != self.n_features {
            return Err(AiCoreError::Schema(format!(
                "ensemble expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        if let Some(pos) = row.iter().position(|v| !v.is_finite()) {
            return Err(AiCoreError::Numeric(format!("feature {pos} is not finite")));
        }
        if self.trees.is_empty() {
            return Err(AiCoreError::Configuration("ensemble has no trees".to_string()));
        }

        let mut votes = [0usize; NUM_CLASSES];
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let label = tree.evaluate(row).ok_or_else(|| {
                AiCoreError::Artifact(format!("tree {tree_idx} has an invalid structure"))
            })?;
            votes[label.index()] += 1;
        }
        Ok(votes)
    }

    /// Fraction of trees voting for each class, indexed by `Label::index`
    pub fn predict_proba(&self, row: &[f64]) -> Result<[f64; NUM_CLASSES]> {
        let votes = self.votes(row)?;
        let total = self.trees.len() as f64;
        Ok([votes[0] as f64 / total, votes[1] as f64 / total])
    }

    /// Majority vote; Real wins ties
    pub fn predict(&self, row: &[f64]) -> Result<Label> {
        let votes = self.votes(row)?;
        Ok(majority(&votes))
    }

    /// Predicted label and the probability assigned to it
    pub fn predict_with_confidence(&self, row: &[f64]) -> Result<(Label, f64)> {
        let votes = self.votes(row)?;
        let label = majority(&votes);
        Ok((label, votes[label.index()] as f64 / self.trees.len() as f64))
    }

    /// Predict every row of a standardized matrix
    pub fn predict_batch(&self, matrix: &[Vec<f64>]) -> Result<Vec<Label>> {
        matrix.iter().map(|row| self.predict(row)).collect()
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(AiCoreError::Artifact(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }
        if self.n_features == 0 {
            return Err(AiCoreError::Artifact("model has zero features".to_string()));
        }
        if self.trees.is_empty() {
            return Err(AiCoreError::Artifact("model has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features).map_err(|e| {
                AiCoreError::Artifact(format!("Tree {} validation failed: {}", i, e))
            })?;
        }
        Ok(())
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(to_canonical_json(self)?)
    }

    /// Compute model hash as hex string
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }
}

fn majority(votes: &[usize; NUM_CLASSES]) -> Label {
    if votes[Label::Fake.index()] > votes[Label::Real.index()] {
        Label::Fake
    } else {
        Label::Real
    }
}
