//! Inference service configuration
//!
//! Defaults, then an optional TOML file, then `PROFILEGUARD_*`
//! environment variables.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{Result, ServiceError};

pub const ENV_MODEL_DIR: &str = "PROFILEGUARD_MODEL_DIR";
pub const ENV_MODE: &str = "PROFILEGUARD_MODE";
pub const ENV_LOG: &str = "PROFILEGUARD_LOG";
pub const ENV_CONFIG: &str = "PROFILEGUARD_CONFIG";

/// How the service obtains its scaler/model pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Load the persisted pair when valid, otherwise bootstrap
    #[default]
    Auto,
    /// Persisted pair only; without one every call returns the sentinel
    Loaded,
    /// Always fit the built-in synthetic model
    Bootstrap,
}

impl FromStr for ServiceMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ServiceMode::Auto),
            "loaded" | "load" => Ok(ServiceMode::Loaded),
            "bootstrap" => Ok(ServiceMode::Bootstrap),
            other => Err(ServiceError::ConfigError(format!("unknown mode: {other}"))),
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceMode::Auto => "auto",
            ServiceMode::Loaded => "loaded",
            ServiceMode::Bootstrap => "bootstrap",
        };
        f.write_str(name)
    }
}

/// Service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding the persisted artifact pair
    pub model_dir: PathBuf,
    pub mode: ServiceMode,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/profileguard"),
            mode: ServiceMode::Auto,
            log_level: "warn".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load from `PROFILEGUARD_CONFIG` (if set) and the environment
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var(ENV_CONFIG) {
            Ok(path) => Self::load_from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ServiceError::ConfigError(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply environment-style overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_MODEL_DIR).filter(|d| !d.trim().is_empty()) {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup(ENV_MODE) {
            match mode.parse() {
                Ok(mode) => self.mode = mode,
                Err(e) => warn!("ignoring {}: {}", ENV_MODE, e),
            }
        }
        if let Some(level) = lookup(ENV_LOG).filter(|l| !l.trim().is_empty()) {
            self.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("AUTO".parse::<ServiceMode>().unwrap(), ServiceMode::Auto);
        assert_eq!("loaded".parse::<ServiceMode>().unwrap(), ServiceMode::Loaded);
        assert_eq!(" bootstrap ".parse::<ServiceMode>().unwrap(), ServiceMode::Bootstrap);
        assert!("remote".parse::<ServiceMode>().is_err());
        assert_eq!(ServiceMode::Loaded.to_string(), "loaded");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_MODEL_DIR, "/srv/models"),
            (ENV_MODE, "bootstrap"),
            (ENV_LOG, "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.mode, ServiceMode::Bootstrap);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_mode_keeps_previous() {
        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| (key == ENV_MODE).then(|| "sometimes".to_string()));
        assert_eq!(config.mode, ServiceMode::Auto);
    }

    #[test]
    fn test_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "model_dir = \"artifacts/current\"").unwrap();
        writeln!(file, "mode = \"loaded\"").unwrap();
        file.flush().unwrap();

        let config = ServiceConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("artifacts/current"));
        assert_eq!(config.mode, ServiceMode::Loaded);
        assert_eq!(config.log_level, "warn");
    }
}
