//! Call-boundary codec
//!
//! A request is one JSON object mapping feature names to numbers or
//! booleans. A response always carries exactly `prediction` and
//! `confidence`.

use std::collections::BTreeMap;

use profileguard_ai_core::{FeatureSchema, FeatureVector, Label};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, ServiceError};

/// Label reported when no prediction could be made
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Confidence reported alongside [`UNKNOWN_LABEL`]
pub const SENTINEL_CONFIDENCE: f64 = 0.5;

/// Named feature values from one request
pub type FeatureMap = BTreeMap<String, f64>;

/// Wire response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub confidence: f64,
}

impl PredictionResponse {
    pub fn sentinel() -> Self {
        Self {
            prediction: UNKNOWN_LABEL.to_string(),
            confidence: SENTINEL_CONFIDENCE,
        }
    }

    pub fn from_label(label: Label, confidence: f64) -> Self {
        Self {
            prediction: label.as_str().to_string(),
            confidence,
        }
    }

    /// True for the "no information" fallback, as opposed to a real
    /// prediction that happens to sit at 0.5
    pub fn is_sentinel(&self) -> bool {
        self.prediction == UNKNOWN_LABEL
    }

    /// Compact JSON line; falls back to the literal sentinel encoding
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"prediction":"Unknown","confidence":0.5}"#.to_string())
    }
}

impl Default for PredictionResponse {
    fn default() -> Self {
        Self::sentinel()
    }
}

/// Decode a JSON object of feature values
///
/// Booleans read as 1/0. Anything other than a finite number or a boolean
/// is a numeric error.
pub fn parse_request(payload: &str) -> Result<FeatureMap> {
    let value: Value = serde_json::from_str(payload)?;
    let Value::Object(fields) = value else {
        return Err(ServiceError::Request(
            "request must be a JSON object".to_string(),
        ));
    };

    fields
        .into_iter()
        .map(|(name, value)| {
            let number = match &value {
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
                _ => None,
            };
            number.map(|n| (name.clone(), n)).ok_or_else(|| {
                ServiceError::Numeric(format!("feature {name} has non-numeric value {value}"))
            })
        })
        .collect()
}

/// Lay the named values out in schema order; absent names read as 0
pub fn feature_row(features: &FeatureMap, schema: FeatureSchema) -> FeatureVector {
    for name in features.keys() {
        if !schema.feature_names().contains(&name.as_str()) {
            debug!(feature = %name, schema = schema.name(), "ignoring unknown feature");
        }
    }

    schema
        .feature_names()
        .iter()
        .map(|name| features.get(*name).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_values() {
        let map = parse_request(r#"{"has_username":true,"url_length":95,"platform":1.0}"#).unwrap();
        assert_eq!(map["has_username"], 1.0);
        assert_eq!(map["url_length"], 95.0);
        assert_eq!(map["platform"], 1.0);
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        assert!(matches!(
            parse_request(r#"{"url_length":"long"}"#),
            Err(ServiceError::Numeric(_))
        ));
        assert!(matches!(
            parse_request(r#"{"url_length":null}"#),
            Err(ServiceError::Numeric(_))
        ));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        assert!(matches!(parse_request("{"), Err(ServiceError::Request(_))));
        assert!(matches!(parse_request("[1, 2]"), Err(ServiceError::Request(_))));
    }

    #[test]
    fn test_missing_features_default_to_zero() {
        let map = parse_request(r#"{"url_length":40,"unrelated":7}"#).unwrap();
        let row = feature_row(&map, FeatureSchema::Inference);
        assert_eq!(row, vec![0.0, 0.0, 40.0, 0.0, 0.0]);

        let empty = feature_row(&FeatureMap::new(), FeatureSchema::Training);
        assert_eq!(empty, vec![0.0; 9]);
    }

    #[test]
    fn test_response_has_exactly_two_fields() {
        let json = PredictionResponse::from_label(Label::Fake, 0.9).to_json();
        let value: Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert_eq!(object["prediction"], "Fake");
        assert_eq!(object["confidence"], 0.9);
    }

    #[test]
    fn test_sentinel_encoding() {
        let sentinel = PredictionResponse::sentinel();
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.to_json(), r#"{"prediction":"Unknown","confidence":0.5}"#);
        assert!(!PredictionResponse::from_label(Label::Real, 0.5).is_sentinel());
    }
}
