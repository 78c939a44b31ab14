//! Profile classification core
//!
//! Feature schema, standardization and a bagged decision-tree ensemble
//! shared by the offline trainer and the inference service.
//!
//! Modules:
//! - `features`: Feature schemas, labels and training-vector extraction
//! - `scaler`: Per-feature standardization fitted on the training partition
//! - `forest`: Bagged classification trees with weighted Gini splits
//! - `artifacts`: Atomic persistence of the (scaler, model) pair
//! - `deterministic`: Seeded RNG, hashing and tie-breaking
//! - `serde_canon`: Canonical JSON and BLAKE3 digests

pub mod artifacts;
pub mod deterministic;
pub mod errors;
pub mod features;
pub mod forest;
pub mod scaler;
pub mod serde_canon;

pub use artifacts::{ArtifactManifest, ArtifactPair};
pub use errors::{AiCoreError, Result};
pub use features::{
    derive_label, extract_training_features, FeatureMatrix, FeatureSchema, FeatureVector, Label,
    ProfileRecord, INFERENCE_FEATURES, TRAINING_FEATURES,
};
pub use forest::{ClassWeight, EnsembleClassifier, ForestConfig};
pub use scaler::StandardScaler;

/// Crate version string for manifests and logs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
