//! Per-feature standardization (zero mean, unit variance)
//!
//! Statistics are computed once from a reference matrix and then applied
//! unchanged to every matrix of the same width. A zero-variance column
//! maps to 0 for every row.

use crate::errors::{AiCoreError, Result};
use crate::features::FeatureMatrix;
use serde::{Deserialize, Serialize};

/// Fitted scaler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column means
    pub mean: Vec<f64>,
    /// Column population standard deviations
    pub std: Vec<f64>,
    /// Number of rows seen during fit
    pub n_samples: usize,
}

impl StandardScaler {
    /// Compute column mean and population standard deviation
    pub fn fit(matrix: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = matrix.first() else {
            return Err(AiCoreError::Configuration(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        };
        let width = first.len();
        if width == 0 {
            return Err(AiCoreError::Schema("scaler input has no columns".to_string()));
        }

        let n = matrix.len() as f64;
        let mut mean = vec![0.0; width];
        for (row_idx, row) in matrix.iter().enumerate() {
            check_row(row, width, row_idx)?;
            for (acc, &value) in mean.iter_mut().zip(row) {
                *acc += value;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        // Second pass: population variance around the fitted mean
        let mut var = vec![0.0; width];
        for row in matrix {
            for ((acc, &value), &m) in var.iter_mut().zip(row).zip(&mean) {
                let d = value - m;
                *acc += d * d;
            }
        }
        let std = var.into_iter().map(|v| (v / n).sqrt()).collect();

        Ok(Self {
            mean,
            std,
            n_samples: matrix.len(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one row
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        check_row(row, self.n_features(), 0)?;
        Ok(self.scale_row(row))
    }

    /// Standardize every row with the fitted statistics
    pub fn transform(&self, matrix: &[Vec<f64>]) -> Result<FeatureMatrix> {
        matrix
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                check_row(row, self.n_features(), row_idx)?;
                Ok(self.scale_row(row))
            })
            .collect()
    }

    fn scale_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&value, (&mean, &std))| {
                if std == 0.0 {
                    0.0
                } else {
                    (value - mean) / std
                }
            })
            .collect()
    }

    /// Structural check used after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.mean.is_empty() || self.mean.len() != self.std.len() {
            return Err(AiCoreError::Artifact(format!(
                "scaler has {} means and {} deviations",
                self.mean.len(),
                self.std.len()
            )));
        }
        if self.std.iter().any(|s| !s.is_finite() || *s < 0.0)
            || self.mean.iter().any(|m| !m.is_finite())
        {
            return Err(AiCoreError::Artifact(
                "scaler statistics are not finite".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_row(row: &[f64], width: usize, row_idx: usize) -> Result<()> {
    if row.len() != width {
        return Err(AiCoreError::Schema(format!(
            "row {} has {} features, expected {}",
            row_idx,
            row.len(),
            width
        )));
    }
    if let Some(pos) = row.iter().position(|v| !v.is_finite()) {
        return Err(AiCoreError::Numeric(format!(
            "row {} feature {} is not finite",
            row_idx, pos
        )));
    }
    Ok(())
}
