//! Training configuration
//!
//! Parameters resolve in layers: built-in defaults, an optional TOML
//! file, `PROFILEGUARD_*` environment variables, then CLI flags (applied
//! by the binary).

use std::path::Path;

use profileguard_ai_core::{ClassWeight, ForestConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{Result, TrainerError};

/// Environment variable prefix for trainer overrides
pub const ENV_PREFIX: &str = "PROFILEGUARD_";

/// Hyperparameters for one training run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub tree_count: usize,
    pub max_depth: usize,
    pub seed: i64,
    pub class_weight: ClassWeight,
    pub test_fraction: f64,
    pub min_samples_split: usize,
    /// Features tried per split; unset means floor(sqrt(n_features))
    pub max_features: Option<usize>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            tree_count: 300,
            max_depth: 15,
            seed: 42,
            class_weight: ClassWeight::Balanced,
            test_fraction: 0.2,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

impl TrainingParams {
    /// Load parameters from a TOML file; absent keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading training configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            TrainerError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `PROFILEGUARD_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparseable values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        override_parsed(&mut self.tree_count, "TREE_COUNT", var("TREE_COUNT"));
        override_parsed(&mut self.max_depth, "MAX_DEPTH", var("MAX_DEPTH"));
        override_parsed(&mut self.seed, "SEED", var("SEED"));
        override_parsed(&mut self.test_fraction, "TEST_FRACTION", var("TEST_FRACTION"));
        override_parsed(
            &mut self.min_samples_split,
            "MIN_SAMPLES_SPLIT",
            var("MIN_SAMPLES_SPLIT"),
        );

        if let Some(value) = var("MAX_FEATURES") {
            match value.trim() {
                "sqrt" | "" => self.max_features = None,
                n => match n.parse() {
                    Ok(n) => self.max_features = Some(n),
                    Err(_) => warn!(value = n, "ignoring invalid {ENV_PREFIX}MAX_FEATURES"),
                },
            }
        }

        if let Some(value) = var("CLASS_WEIGHT") {
            match value.trim().to_lowercase().as_str() {
                "balanced" => self.class_weight = ClassWeight::Balanced,
                "none" | "uniform" => self.class_weight = ClassWeight::Uniform,
                other => warn!(value = other, "ignoring invalid {ENV_PREFIX}CLASS_WEIGHT"),
            }
        }
    }

    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainerError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.tree_count == 0 || self.max_depth == 0 {
            return Err(TrainerError::Config(
                "tree_count and max_depth must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::Config(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Ensemble hyperparameters
    pub fn forest_config(&self) -> ForestConfig {
        ForestConfig {
            tree_count: self.tree_count,
            max_depth: self.max_depth,
            seed: self.seed,
            class_weight: self.class_weight,
            min_samples_split: self.min_samples_split,
            max_features: self.max_features,
        }
    }
}

fn override_parsed<T: std::str::FromStr>(slot: &mut T, name: &str, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(value = %value, "ignoring invalid {ENV_PREFIX}{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let params = TrainingParams::default();
        assert_eq!(params.tree_count, 300);
        assert_eq!(params.max_depth, 15);
        assert_eq!(params.seed, 42);
        assert_eq!(params.class_weight, ClassWeight::Balanced);
        assert_eq!(params.test_fraction, 0.2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "tree_count = 50")?;
        writeln!(file, "class_weight = \"uniform\"")?;
        file.flush()?;

        let params = TrainingParams::load_from_file(file.path())?;
        assert_eq!(params.tree_count, 50);
        assert_eq!(params.class_weight, ClassWeight::Uniform);
        assert_eq!(params.max_depth, 15);
        Ok(())
    }

    #[test]
    fn test_malformed_toml_is_config_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "tree_count = \"many\"")?;
        file.flush()?;

        assert!(matches!(
            TrainingParams::load_from_file(file.path()),
            Err(TrainerError::Config(_))
        ));
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<String, String> = [
            ("PROFILEGUARD_TREE_COUNT", "12"),
            ("PROFILEGUARD_SEED", "-5"),
            ("PROFILEGUARD_MAX_FEATURES", "4"),
            ("PROFILEGUARD_CLASS_WEIGHT", "None"),
            ("PROFILEGUARD_MAX_DEPTH", "deep"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut params = TrainingParams::default();
        params.apply_overrides(|key| env.get(key).cloned());

        assert_eq!(params.tree_count, 12);
        assert_eq!(params.seed, -5);
        assert_eq!(params.max_features, Some(4));
        assert_eq!(params.class_weight, ClassWeight::Uniform);
        // invalid value leaves the default in place
        assert_eq!(params.max_depth, 15);
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let params = TrainingParams {
            test_fraction: 1.0,
            ..TrainingParams::default()
        };
        assert!(matches!(params.validate(), Err(TrainerError::Config(_))));
    }

    #[test]
    fn test_forest_config_mapping() {
        let params = TrainingParams {
            tree_count: 10,
            seed: 9,
            ..TrainingParams::default()
        };
        let forest = params.forest_config();
        assert_eq!(forest.tree_count, 10);
        assert_eq!(forest.seed, 9);
        assert_eq!(forest.max_depth, 15);
        assert_eq!(forest.max_features, None);
    }
}
