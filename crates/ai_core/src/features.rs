//! Feature schema and label derivation for profile classification
//!
//! Two fixed schemas exist: the 9-column training schema built from the
//! labelled profile dataset, and the 5-column inference schema built from
//! a profile URL. Column order is part of the schema and must match the
//! scaler and ensemble that consume the vector.

use crate::errors::{AiCoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense feature vector in schema order
pub type FeatureVector = Vec<f64>;

/// Row-major feature matrix
pub type FeatureMatrix = Vec<Vec<f64>>;

/// Number of label classes (Real, Fake)
pub const NUM_CLASSES: usize = 2;

/// Training schema, in column order
pub const TRAINING_FEATURES: [&str; 9] = [
    "followers_count",
    "friends_count",
    "statuses_count",
    "favourites_count",
    "listed_count",
    "username_length",
    "has_profile_pic",
    "protected",
    "verified",
];

/// Inference schema, in column order
pub const INFERENCE_FEATURES: [&str; 5] = [
    "has_username",
    "has_query_params",
    "url_length",
    "has_special_chars",
    "platform",
];

/// Column carrying the origin tag used to derive the label
pub const ORIGIN_COLUMN: &str = "dataset";
pub const SCREEN_NAME_COLUMN: &str = "screen_name";
pub const PROFILE_IMAGE_COLUMN: &str = "profile_image_url_https";

/// Raw numeric columns copied straight into the training vector
pub const NUMERIC_COLUMNS: [&str; 7] = [
    "followers_count",
    "friends_count",
    "statuses_count",
    "favourites_count",
    "listed_count",
    "protected",
    "verified",
];

/// Every raw column the dataset must provide (lowercased)
pub fn required_columns() -> Vec<&'static str> {
    let mut columns = vec![ORIGIN_COLUMN, SCREEN_NAME_COLUMN, PROFILE_IMAGE_COLUMN];
    columns.extend_from_slice(&NUMERIC_COLUMNS);
    columns
}

/// Which fixed schema a scaler/ensemble pair was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    Training,
    Inference,
}

impl FeatureSchema {
    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            FeatureSchema::Training => &TRAINING_FEATURES,
            FeatureSchema::Inference => &INFERENCE_FEATURES,
        }
    }

    pub fn arity(&self) -> usize {
        self.feature_names().len()
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureSchema::Training => "training",
            FeatureSchema::Inference => "inference",
        }
    }

    /// Fails with a schema error when `len` differs from this schema's arity
    pub fn check_arity(&self, len: usize) -> Result<()> {
        if len != self.arity() {
            return Err(AiCoreError::Schema(format!(
                "{} schema expects {} features, got {}",
                self.name(),
                self.arity(),
                len
            )));
        }
        Ok(())
    }
}

/// Binary class label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Real = 0,
    Fake = 1,
}

impl Label {
    /// Label from the dataset origin tag: "fake" in any case is Fake,
    /// everything else (including a missing tag) is Real
    pub fn from_origin(origin: Option<&str>) -> Self {
        match origin {
            Some(tag) if tag.to_lowercase() == "fake" => Label::Fake,
            _ => Label::Real,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Real),
            1 => Some(Label::Fake),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Real => "Real",
            Label::Fake => "Fake",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw row of the profile dataset after header normalisation.
///
/// `None` marks a missing cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRecord {
    pub dataset: Option<String>,
    pub screen_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub followers_count: Option<f64>,
    pub friends_count: Option<f64>,
    pub statuses_count: Option<f64>,
    pub favourites_count: Option<f64>,
    pub listed_count: Option<f64>,
    pub protected: Option<f64>,
    pub verified: Option<f64>,
}

/// Character count of the screen name rendered as text; a missing name
/// renders as "nan"
pub fn username_length(screen_name: Option<&str>) -> f64 {
    screen_name.unwrap_or("nan").chars().count() as f64
}

pub fn has_profile_pic(profile_image_url: Option<&str>) -> f64 {
    if profile_image_url.is_some() {
        1.0
    } else {
        0.0
    }
}

/// Derive the label of a raw record
pub fn derive_label(record: &ProfileRecord) -> Label {
    Label::from_origin(record.dataset.as_deref())
}

/// Build the 9-element training vector; missing numerics become 0
pub fn extract_training_features(record: &ProfileRecord) -> FeatureVector {
    let numeric = |value: Option<f64>| value.unwrap_or(0.0);

    vec![
        numeric(record.followers_count),
        numeric(record.friends_count),
        numeric(record.statuses_count),
        numeric(record.favourites_count),
        numeric(record.listed_count),
        username_length(record.screen_name.as_deref()),
        has_profile_pic(record.profile_image_url.as_deref()),
        numeric(record.protected),
        numeric(record.verified),
    ]
}
