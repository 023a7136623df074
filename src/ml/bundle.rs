//! Model bundle format and artifact discovery
//!
//! A bundle is a JSON document:
//!
//! ```json
//! {
//!   "model": { "type": "linear_regression", "coefficients": [..], "intercept": 0.0 },
//!   "scaler": { "type": "standard", "mean": [..], "scale": [..] },
//!   "feature_names": ["temp", "wind", ..],
//!   "performance_metrics": { "r2": 0.91 },
//!   "model_type": "Enhanced Linear Regression"
//! }
//! ```
//!
//! Older bundles name the feature list `feature_columns` and the metrics
//! `performance`; both spellings are accepted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{MLModel, PerformanceMetrics, Predictor, Scaler};
use crate::config::ModelConfig;

/// Artifact loading errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("No model artifact found (searched {searched:?})")]
    Missing { searched: Vec<PathBuf> },
    #[error("Model artifact {} could not be loaded: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// On-disk bundle layout
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: Predictor,
    #[serde(default)]
    pub scaler: Option<Scaler>,
    #[serde(alias = "feature_columns")]
    pub feature_names: Vec<String>,
    #[serde(default, alias = "performance", alias = "model_info")]
    pub performance_metrics: PerformanceMetrics,
    #[serde(default)]
    pub model_type: Option<String>,
}

/// A bundle ready to serve, held immutably for the process lifetime
pub struct LoadedModel {
    pub model: Box<dyn MLModel>,
    pub scaler: Option<Scaler>,
    /// Order the predictor was trained against
    pub feature_names: Vec<String>,
    pub metrics: PerformanceMetrics,
    /// Label reported by the status endpoint
    pub model_type: String,
    /// Artifact the bundle came from, `None` when built in memory
    pub source: Option<PathBuf>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_type", &self.model_type)
            .field("feature_count", &self.feature_names.len())
            .field("scaled", &self.scaler.is_some())
            .field("source", &self.source)
            .finish()
    }
}

impl LoadedModel {
    pub fn new(
        model: Box<dyn MLModel>,
        scaler: Option<Scaler>,
        feature_names: Vec<String>,
        metrics: PerformanceMetrics,
    ) -> Self {
        let model_type = model.algorithm().to_string();
        Self {
            model,
            scaler,
            feature_names,
            metrics,
            model_type,
            source: None,
        }
    }

    pub fn from_bundle(bundle: ModelBundle, source: PathBuf) -> Self {
        let model = bundle.model.into_model();
        let model_type = bundle
            .model_type
            .unwrap_or_else(|| model.algorithm().to_string());

        let loaded = Self {
            model,
            scaler: bundle.scaler,
            feature_names: bundle.feature_names,
            metrics: bundle.performance_metrics,
            model_type,
            source: Some(source),
        };
        loaded.warn_on_inconsistent_widths();
        loaded
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn held_out_r2(&self) -> Option<f64> {
        self.metrics.held_out_r2()
    }

    /// File name of the artifact, for status output
    pub fn artifact_name(&self) -> Option<String> {
        self.source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    fn warn_on_inconsistent_widths(&self) {
        let expected = self.feature_names.len();
        if let Some(width) = self.model.n_features() {
            if width != expected {
                warn!(
                    model_width = width,
                    feature_count = expected,
                    "Model width disagrees with its feature list; predictions will fall back"
                );
            }
        }
        if let Some(scaler) = &self.scaler {
            if scaler.n_features() != expected {
                warn!(
                    scaler_width = scaler.n_features(),
                    feature_count = expected,
                    "Scaler width disagrees with the feature list"
                );
            }
        }
    }
}

/// Locates and loads the first usable bundle from a list of candidates
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    directory: PathBuf,
    candidates: Vec<String>,
}

impl ArtifactLoader {
    pub fn new(directory: impl Into<PathBuf>, candidates: Vec<String>) -> Self {
        Self {
            directory: directory.into(),
            candidates,
        }
    }

    pub fn from_config(cfg: &ModelConfig) -> Self {
        Self::new(&cfg.directory, cfg.candidates.clone())
    }

    /// Try candidates in priority order and return the first that loads.
    ///
    /// Fails with `Missing` when no candidate exists, or with the last
    /// `Corrupt` error when every existing candidate failed to load.
    pub fn load(&self) -> Result<LoadedModel, ArtifactError> {
        let mut searched = Vec::with_capacity(self.candidates.len());
        let mut last_error = None;

        for candidate in &self.candidates {
            let path = self.directory.join(candidate);
            searched.push(path.clone());

            if !path.is_file() {
                debug!(path = %path.display(), "Model artifact not present");
                continue;
            }

            match read_bundle(&path) {
                Ok(bundle) => {
                    let loaded = LoadedModel::from_bundle(bundle, path);
                    info!(
                        artifact = %candidate,
                        model_type = %loaded.model_type,
                        features = loaded.feature_count(),
                        scaled = loaded.scaler.is_some(),
                        r2 = ?loaded.held_out_r2(),
                        "Model loaded"
                    );
                    return Ok(loaded);
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable model artifact");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(ArtifactError::Missing { searched }))
    }
}

fn read_bundle(path: &Path) -> Result<ModelBundle, ArtifactError> {
    let corrupt = |reason: String| ArtifactError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| corrupt(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))
}
