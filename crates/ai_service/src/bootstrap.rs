//! Built-in fallback model
//!
//! A tiny ensemble fitted in-process on a fixed synthetic set over the
//! 5-feature inference schema. Used when no persisted pair is available.
//! `has_username` and `platform` take the same values in both classes, so
//! only the query string, URL length and special characters carry signal.

use profileguard_ai_core::{
    ArtifactPair, ClassWeight, EnsembleClassifier, FeatureSchema, ForestConfig, Label,
    StandardScaler,
};
use tracing::debug;

pub const BOOTSTRAP_TREES: usize = 10;
pub const BOOTSTRAP_MAX_DEPTH: usize = 5;
pub const BOOTSTRAP_SEED: i64 = 42;

/// Rows in `INFERENCE_FEATURES` order:
/// has_username, has_query_params, url_length, has_special_chars, platform
const REAL_PROFILES: [[f64; 5]; 6] = [
    [1.0, 0.0, 28.0, 0.0, 1.0],
    [1.0, 0.0, 32.0, 0.0, 2.0],
    [0.0, 0.0, 24.0, 0.0, 0.0],
    [1.0, 0.0, 41.0, 0.0, 1.0],
    [0.0, 0.0, 36.0, 0.0, 2.0],
    [1.0, 0.0, 30.0, 0.0, 0.0],
];

const FAKE_PROFILES: [[f64; 5]; 6] = [
    [1.0, 1.0, 96.0, 1.0, 1.0],
    [1.0, 1.0, 110.0, 1.0, 2.0],
    [0.0, 1.0, 88.0, 1.0, 0.0],
    [1.0, 1.0, 120.0, 1.0, 1.0],
    [0.0, 1.0, 102.0, 1.0, 2.0],
    [1.0, 1.0, 84.0, 1.0, 0.0],
];

/// The 12 synthetic rows and their labels, real rows first
pub fn bootstrap_dataset() -> (Vec<Vec<f64>>, Vec<Label>) {
    let rows = REAL_PROFILES
        .iter()
        .map(|r| (r, Label::Real))
        .chain(FAKE_PROFILES.iter().map(|r| (r, Label::Fake)));

    rows.map(|(row, label)| (row.to_vec(), label)).unzip()
}

pub fn bootstrap_config() -> ForestConfig {
    ForestConfig {
        tree_count: BOOTSTRAP_TREES,
        max_depth: BOOTSTRAP_MAX_DEPTH,
        seed: BOOTSTRAP_SEED,
        class_weight: ClassWeight::Uniform,
        ..ForestConfig::default()
    }
}

/// Fit the scaler and ensemble on the synthetic set
pub fn bootstrap_pair() -> profileguard_ai_core::Result<ArtifactPair> {
    let (raw, labels) = bootstrap_dataset();
    let scaler = StandardScaler::fit(&raw)?;
    let scaled = scaler.transform(&raw)?;
    let model = EnsembleClassifier::fit(&scaled, &labels, bootstrap_config())?;
    debug!(trees = model.num_trees(), "bootstrap ensemble fitted");
    ArtifactPair::new(FeatureSchema::Inference, scaler, model)
}
