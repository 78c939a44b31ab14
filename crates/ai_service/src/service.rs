//! Inference service
//!
//! Holds one immutable scaler/model pair for its whole lifetime and
//! answers single-profile predictions. `predict` is total: every failure
//! is logged and answered with the sentinel response.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use profileguard_ai_core::{AiCoreError, ArtifactPair, FeatureSchema, Label};
use tracing::{debug, info, warn};

use crate::bootstrap::bootstrap_pair;
use crate::boundary::{feature_row, parse_request, FeatureMap, PredictionResponse};
use crate::config::{ServiceConfig, ServiceMode};
use crate::errors::{Result, ServiceError};
use crate::url_features::extract_url_features;

/// Where the active pair came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Persisted pair, identified by its model digest
    Loaded { model_hash: String },
    /// Built-in synthetic model
    Bootstrap,
    /// No usable pair; every call returns the sentinel
    Unavailable { reason: String },
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Loaded { model_hash } => write!(f, "loaded ({model_hash})"),
            ModelSource::Bootstrap => f.write_str("bootstrap"),
            ModelSource::Unavailable { reason } => write!(f, "unavailable ({reason})"),
        }
    }
}

/// Single-profile classifier over one scaler/model pair
#[derive(Debug, Clone)]
pub struct InferenceService {
    pair: Option<ArtifactPair>,
    source: ModelSource,
}

impl InferenceService {
    /// Serve a persisted pair trained on the 9-feature schema
    pub fn loaded(model_dir: &Path) -> Result<Self> {
        let (pair, manifest) = ArtifactPair::load(model_dir)?;
        if pair.schema != FeatureSchema::Training {
            return Err(ServiceError::ConfigError(format!(
                "artifact pair in {} uses the {} schema",
                model_dir.display(),
                pair.schema.name()
            )));
        }
        info!(
            dir = %model_dir.display(),
            model_hash = %manifest.model_hash,
            trees = manifest.tree_count,
            "serving persisted model"
        );
        Ok(Self {
            pair: Some(pair),
            source: ModelSource::Loaded {
                model_hash: manifest.model_hash,
            },
        })
    }

    /// Serve the built-in synthetic model on the 5-feature schema
    pub fn bootstrap() -> Result<Self> {
        let pair = bootstrap_pair()?;
        info!(trees = pair.model.num_trees(), "serving bootstrap model");
        Ok(Self {
            pair: Some(pair),
            source: ModelSource::Bootstrap,
        })
    }

    /// A service that answers every call with the sentinel
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            pair: None,
            source: ModelSource::Unavailable {
                reason: reason.into(),
            },
        }
    }

    /// Build the service for `config.mode`; never fails
    pub fn from_config(config: &ServiceConfig) -> Self {
        let result = match config.mode {
            ServiceMode::Loaded => Self::loaded(&config.model_dir),
            ServiceMode::Bootstrap => Self::bootstrap(),
            ServiceMode::Auto if ArtifactPair::exists(&config.model_dir) => {
                Self::loaded(&config.model_dir).or_else(|e| {
                    warn!(error = %e, "persisted pair unusable, falling back to bootstrap");
                    Self::bootstrap()
                })
            }
            ServiceMode::Auto => {
                debug!(dir = %config.model_dir.display(), "no persisted pair, using bootstrap");
                Self::bootstrap()
            }
        };

        result.unwrap_or_else(|e| {
            warn!(mode = %config.mode, error = %e, "model unavailable");
            Self::unavailable(e.to_string())
        })
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Feature schema of the active pair
    pub fn schema(&self) -> Option<FeatureSchema> {
        self.pair.as_ref().map(|pair| pair.schema)
    }

    pub fn is_available(&self) -> bool {
        self.pair.is_some()
    }

    /// Fallible prediction; absent features read as 0
    ///
    /// A non-empty request must name at least one feature of the active
    /// schema, otherwise it is a schema error.
    pub fn try_predict(&self, features: &FeatureMap) -> Result<(Label, f64)> {
        let pair = self.pair.as_ref().ok_or_else(|| {
            ServiceError::Unavailable(self.source.to_string())
        })?;

        let names = pair.schema.feature_names();
        if !features.is_empty() && !features.keys().any(|key| names.contains(&key.as_str())) {
            return Err(AiCoreError::Schema(format!(
                "request names no feature of the {} schema",
                pair.schema.name()
            ))
            .into());
        }

        let row = feature_row(features, pair.schema);
        if let Some((name, _)) = pair
            .schema
            .feature_names()
            .iter()
            .zip(&row)
            .find(|(_, value)| !value.is_finite())
        {
            return Err(ServiceError::Numeric(format!("feature {name} is not finite")));
        }

        let (label, confidence) = pair.predict_row(&row)?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ServiceError::Internal(format!(
                "confidence {confidence} out of range"
            )));
        }
        Ok((label, confidence))
    }

    /// Total prediction: any error or panic yields the sentinel
    pub fn predict(&self, features: &FeatureMap) -> PredictionResponse {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_predict(features)));

        match outcome {
            Ok(Ok((label, confidence))) => {
                debug!(prediction = %label, confidence, "prediction");
                PredictionResponse::from_label(label, confidence)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "prediction failed, returning sentinel");
                PredictionResponse::sentinel()
            }
            Err(_) => {
                warn!("prediction panicked, returning sentinel");
                PredictionResponse::sentinel()
            }
        }
    }

    /// Total prediction from a JSON request payload
    pub fn predict_json(&self, payload: &str) -> PredictionResponse {
        match parse_request(payload) {
            Ok(features) => self.predict(&features),
            Err(e) => {
                warn!(error = %e, "rejecting request, returning sentinel");
                PredictionResponse::sentinel()
            }
        }
    }

    /// Total prediction from a profile URL and platform name
    pub fn predict_url(&self, url: &str, platform: &str) -> PredictionResponse {
        if self.schema() != Some(FeatureSchema::Inference) {
            warn!(
                source = %self.source,
                "URL features need the inference schema, returning sentinel"
            );
            return PredictionResponse::sentinel();
        }
        match extract_url_features(url, platform) {
            Ok(features) => self.predict(&features),
            Err(e) => {
                warn!(error = %e, "cannot extract URL features, returning sentinel");
                PredictionResponse::sentinel()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::UNKNOWN_LABEL;

    fn features(pairs: &[(&str, f64)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_bootstrap_flags_obvious_fake() {
        let service = InferenceService::bootstrap().unwrap();
        let response = service.predict(&features(&[
            ("has_username", 1.0),
            ("has_query_params", 1.0),
            ("url_length", 95.0),
            ("has_special_chars", 1.0),
            ("platform", 1.0),
        ]));

        assert_eq!(response.prediction, "Fake");
        assert!(response.confidence > 0.5);
        assert!(response.confidence <= 1.0);
    }

    #[test]
    fn test_empty_request_is_deterministic() {
        let service = InferenceService::bootstrap().unwrap();
        let first = service.predict(&FeatureMap::new());
        let second = service.predict(&FeatureMap::new());

        assert!(!first.is_sentinel());
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first.confidence));
    }

    #[test]
    fn test_unavailable_service_returns_sentinel() {
        let service = InferenceService::unavailable("no model");
        let response = service.predict(&FeatureMap::new());

        assert_eq!(response.prediction, UNKNOWN_LABEL);
        assert_eq!(response.confidence, 0.5);
        assert!(matches!(
            service.try_predict(&FeatureMap::new()),
            Err(ServiceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_non_finite_feature_returns_sentinel() {
        let service = InferenceService::bootstrap().unwrap();
        let response = service.predict(&features(&[("url_length", f64::INFINITY)]));
        assert!(response.is_sentinel());
    }

    #[test]
    fn test_request_off_schema_is_schema_error() {
        let service = InferenceService::bootstrap().unwrap();
        let off_schema = features(&[("followers_count", 3.0), ("friends_count", 900.0)]);

        assert!(matches!(
            service.try_predict(&off_schema),
            Err(ServiceError::Core(AiCoreError::Schema(_)))
        ));
        assert!(service.predict(&off_schema).is_sentinel());

        let mixed = features(&[("followers_count", 3.0), ("url_length", 95.0)]);
        assert!(!service.predict(&mixed).is_sentinel());
    }

    #[test]
    fn test_malformed_json_returns_sentinel() {
        let service = InferenceService::bootstrap().unwrap();
        assert!(service.predict_json("not json").is_sentinel());
        assert!(service.predict_json(r#"{"url_length":"x"}"#).is_sentinel());
        assert!(!service.predict_json(r#"{"url_length":30}"#).is_sentinel());
    }

    #[test]
    fn test_predict_url() {
        let service = InferenceService::bootstrap().unwrap();
        assert!(service.predict_url("::bad::", "instagram").is_sentinel());
        assert!(!service
            .predict_url("https://www.instagram.com/jane.doe/", "instagram")
            .is_sentinel());
    }

    #[test]
    fn test_from_config_modes() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            model_dir: dir.path().join("missing"),
            mode: ServiceMode::Loaded,
            ..ServiceConfig::default()
        };
        let loaded = InferenceService::from_config(&config);
        assert!(!loaded.is_available());
        assert!(loaded.predict(&FeatureMap::new()).is_sentinel());

        let auto = InferenceService::from_config(&ServiceConfig {
            mode: ServiceMode::Auto,
            ..config
        });
        assert_eq!(auto.source(), &ModelSource::Bootstrap);
        assert_eq!(auto.schema(), Some(FeatureSchema::Inference));
    }
}
