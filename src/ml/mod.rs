//! Machine Learning Module
//!
//! Serving side of the generation models:
//! - Model bundles (predictor, optional scaler, feature order, metrics)
//! - Artifact discovery and loading
//! - Input scaling with statistics fixed at training time
//!
//! # Architecture
//! Bundles are trained offline and shipped as JSON documents. They are
//! loaded once at startup and shared read-only by every request.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod bundle;
pub mod models;
pub mod scaler;

#[cfg(feature = "ml")]
pub mod forest;

pub use bundle::*;
pub use models::*;
pub use scaler::*;

/// Metric keys that may carry a held-out R², in order of preference
const R2_KEYS: &[&str] = &["test_r2", "r2_score", "r2"];

/// Free-form performance metadata shipped with a bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceMetrics(BTreeMap<String, serde_json::Value>);

impl PerformanceMetrics {
    /// Held-out R², if the bundle recorded one as a number
    pub fn held_out_r2(&self) -> Option<f64> {
        R2_KEYS
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| value.as_f64())
            .filter(|r2| r2.is_finite())
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != feature_names.len() {
            anyhow::bail!(
                "Feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            );
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    /// Build from parts the caller already produced in lockstep
    pub(crate) fn from_parts(features: Vec<f64>, feature_names: Vec<String>) -> Self {
        debug_assert_eq!(features.len(), feature_names.len());
        Self {
            features,
            feature_names,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Normalize features using min-max scaling
    pub fn normalize(&self, min_vals: &[f64], max_vals: &[f64]) -> Result<Self> {
        if min_vals.len() != self.features.len() || max_vals.len() != self.features.len() {
            anyhow::bail!(
                "Normalization parameter count mismatch: {} features, {} min, {} max",
                self.features.len(),
                min_vals.len(),
                max_vals.len()
            );
        }

        let normalized = self
            .features
            .iter()
            .zip(min_vals.iter().zip(max_vals.iter()))
            .map(|(f, (min, max))| {
                if (max - min).abs() < 1e-10 {
                    f - min // Constant column at training time
                } else {
                    (f - min) / (max - min)
                }
            })
            .collect();

        Ok(Self {
            features: normalized,
            feature_names: self.feature_names.clone(),
        })
    }

    /// Standardize features using z-score normalization
    pub fn standardize(&self, means: &[f64], stds: &[f64]) -> Result<Self> {
        if means.len() != self.features.len() || stds.len() != self.features.len() {
            anyhow::bail!(
                "Standardization parameter count mismatch: {} features, {} means, {} scales",
                self.features.len(),
                means.len(),
                stds.len()
            );
        }

        let standardized = self
            .features
            .iter()
            .zip(means.iter().zip(stds.iter()))
            .map(|(f, (mean, std))| {
                if std.abs() < 1e-10 {
                    f - mean // Zero-variance column is left centred only
                } else {
                    (f - mean) / std
                }
            })
            .collect();

        Ok(Self {
            features: standardized,
            feature_names: self.feature_names.clone(),
        })
    }
}
