//! Persistence of the (scaler, model) artifact pair
//!
//! A pair lives in one directory as `model.json`, `scaler.json` and
//! `manifest.json`. The pair is replaced as a unit: all three files are
//! staged in a sibling directory which is then swapped into place by
//! rename, so a reader sees either the old pair or the new one.

use crate::errors::{AiCoreError, Result};
use crate::features::{FeatureSchema, Label};
use crate::forest::EnsembleClassifier;
use crate::scaler::StandardScaler;
use crate::serde_canon::{from_canonical_json, hash_bytes_hex, to_canonical_json};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifact directory layout version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Metadata written next to the two blobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub schema: FeatureSchema,
    pub feature_names: Vec<String>,
    /// BLAKE3 hex digest of `model.json`
    pub model_hash: String,
    /// BLAKE3 hex digest of `scaler.json`
    pub scaler_hash: String,
    pub tree_count: usize,
    /// Held-out accuracy, when the pair came from a training run
    pub accuracy: Option<f64>,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// A fitted scaler and ensemble that agree on one feature schema
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPair {
    pub schema: FeatureSchema,
    pub scaler: StandardScaler,
    pub model: EnsembleClassifier,
}

impl ArtifactPair {
    /// Bundle a pair, checking that both halves match the schema arity
    pub fn new(
        schema: FeatureSchema,
        scaler: StandardScaler,
        model: EnsembleClassifier,
    ) -> Result<Self> {
        schema.check_arity(scaler.n_features())?;
        schema.check_arity(model.n_features)?;
        Ok(Self {
            schema,
            scaler,
            model,
        })
    }

    /// Standardize one row and return the predicted label with its probability
    pub fn predict_row(&self, row: &[f64]) -> Result<(Label, f64)> {
        self.schema.check_arity(row.len())?;
        let scaled = self.scaler.transform_row(row)?;
        self.model.predict_with_confidence(&scaled)
    }

    /// Whether `dir` holds all three artifact files
    pub fn exists(dir: &Path) -> bool {
        [MODEL_FILE, SCALER_FILE, MANIFEST_FILE]
            .iter()
            .all(|name| dir.join(name).is_file())
    }

    /// Write the pair to `dir`, replacing any previous pair as a unit
    pub fn save_atomic(&self, dir: &Path, accuracy: Option<f64>) -> Result<ArtifactManifest> {
        let model_json = self.model.to_canonical_json()?;
        let scaler_json = to_canonical_json(&self.scaler)?;

        let manifest = ArtifactManifest {
            format_version: ARTIFACT_FORMAT_VERSION,
            schema: self.schema,
            feature_names: self
                .schema
                .feature_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            model_hash: hash_bytes_hex(model_json.as_bytes()),
            scaler_hash: hash_bytes_hex(scaler_json.as_bytes()),
            tree_count: self.model.num_trees(),
            accuracy,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let manifest_json = serde_json::to_string_pretty(&manifest)?;

        let staging = sibling_path(dir, "tmp")?;
        let backup = sibling_path(dir, "old")?;

        remove_stale(&staging)?;
        let staged = stage_files(
            &staging,
            &[
                (MODEL_FILE, model_json.as_str()),
                (SCALER_FILE, scaler_json.as_str()),
                (MANIFEST_FILE, manifest_json.as_str()),
            ],
        );
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        if let Err(e) = swap_into_place(&staging, dir, &backup) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        info!(
            dir = %dir.display(),
            model_hash = %manifest.model_hash,
            trees = manifest.tree_count,
            "artifact pair written"
        );
        Ok(manifest)
    }

    /// Read and verify a pair written by [`ArtifactPair::save_atomic`]
    pub fn load(dir: &Path) -> Result<(Self, ArtifactManifest)> {
        let manifest_json = read_artifact(dir, MANIFEST_FILE)?;
        let manifest: ArtifactManifest = serde_json::from_str(&manifest_json)?;

        if manifest.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(AiCoreError::Artifact(format!(
                "unsupported artifact format version {}",
                manifest.format_version
            )));
        }
        if manifest.feature_names != manifest.schema.feature_names() {
            return Err(AiCoreError::Schema(format!(
                "manifest feature names do not match the {} schema",
                manifest.schema.name()
            )));
        }

        let model_json = read_artifact(dir, MODEL_FILE)?;
        verify_digest(MODEL_FILE, &model_json, &manifest.model_hash)?;
        let scaler_json = read_artifact(dir, SCALER_FILE)?;
        verify_digest(SCALER_FILE, &scaler_json, &manifest.scaler_hash)?;

        let model: EnsembleClassifier = from_canonical_json(&model_json)?;
        model.validate()?;
        let scaler: StandardScaler = from_canonical_json(&scaler_json)?;
        scaler.validate()?;

        if model.n_features != scaler.n_features() {
            return Err(AiCoreError::Schema(format!(
                "scaler has {} features but model expects {}",
                scaler.n_features(),
                model.n_features
            )));
        }

        let pair = Self::new(manifest.schema, scaler, model)?;
        debug!(dir = %dir.display(), schema = manifest.schema.name(), "artifact pair loaded");
        Ok((pair, manifest))
    }
}

fn sibling_path(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        AiCoreError::Artifact(format!("artifact path {} has no directory name", dir.display()))
    })?;
    let mut sibling = name.to_os_string();
    sibling.push(".");
    sibling.push(suffix);
    Ok(dir.with_file_name(sibling))
}

fn stage_files(staging: &Path, files: &[(&str, &str)]) -> Result<()> {
    fs::create_dir_all(staging)?;
    for (name, contents) in files {
        fs::write(staging.join(name), contents)?;
    }
    Ok(())
}

fn swap_into_place(staging: &Path, dir: &Path, backup: &Path) -> Result<()> {
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if backup.is_dir() {
        fs::remove_dir_all(backup)?;
    } else if backup.exists() {
        return Err(AiCoreError::Artifact(format!(
            "backup path {} is occupied by a file",
            backup.display()
        )));
    }

    let had_previous = dir.exists();
    if had_previous {
        fs::rename(dir, backup)?;
    }

    if let Err(e) = fs::rename(staging, dir) {
        if had_previous {
            if let Err(restore) = fs::rename(backup, dir) {
                warn!(error = %restore, "failed to restore previous artifact pair");
            }
        }
        return Err(e.into());
    }

    if had_previous {
        if let Err(e) = fs::remove_dir_all(backup) {
            warn!(error = %e, path = %backup.display(), "stale artifact backup left behind");
        }
    }
    Ok(())
}

/// Remove a leftover staging entry, file or directory
fn remove_stale(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn read_artifact(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path).map_err(|e| {
        AiCoreError::Artifact(format!("cannot read {}: {}", path.display(), e))
    })
}

fn verify_digest(name: &str, contents: &str, expected: &str) -> Result<()> {
    let actual = hash_bytes_hex(contents.as_bytes());
    if actual != expected {
        return Err(AiCoreError::Artifact(format!(
            "{name} digest mismatch: manifest {expected}, file {actual}"
        )));
    }
    Ok(())
}
