use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::FeatureVector;

/// Input scaler fitted at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scaler {
    /// z-score: (x - mean) / scale
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// (x - min) / (max - min)
    MinMax { min: Vec<f64>, max: Vec<f64> },
}

impl Scaler {
    pub fn n_features(&self) -> usize {
        match self {
            Scaler::Standard { mean, .. } => mean.len(),
            Scaler::MinMax { min, .. } => min.len(),
        }
    }

    /// Scale one aligned vector. Fails on width mismatch or non-finite output.
    pub fn transform(&self, vector: &FeatureVector) -> Result<FeatureVector> {
        let scaled = match self {
            Scaler::Standard { mean, scale } => vector.standardize(mean, scale)?,
            Scaler::MinMax { min, max } => vector.normalize(min, max)?,
        };

        if let Some(idx) = scaled.features.iter().position(|v| !v.is_finite()) {
            anyhow::bail!(
                "Scaled feature '{}' is not finite",
                scaled.feature_names.get(idx).map(String::as_str).unwrap_or("?")
            );
        }

        Ok(scaled)
    }
}
