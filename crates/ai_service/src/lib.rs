//! ProfileGuard inference service
//!
//! Answers "is this profile fake?" for a flat map of named features:
//! - loads a persisted scaler/model pair, or builds the bootstrap model
//! - derives inference features from a profile URL
//! - never fails at the call boundary; errors become the sentinel
//!   response `{"prediction":"Unknown","confidence":0.5}`

pub mod bootstrap;
pub mod boundary;
pub mod config;
pub mod errors;
pub mod service;
pub mod url_features;

pub use bootstrap::{bootstrap_pair, BOOTSTRAP_MAX_DEPTH, BOOTSTRAP_SEED, BOOTSTRAP_TREES};
pub use boundary::{
    feature_row, parse_request, FeatureMap, PredictionResponse, SENTINEL_CONFIDENCE,
    UNKNOWN_LABEL,
};
pub use config::{ServiceConfig, ServiceMode};
pub use errors::{Result, ServiceError};
pub use service::{InferenceService, ModelSource};
pub use url_features::{extract_url_features, platform_code};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
