//! Degrading prediction chain: enhanced features, then basic features,
//! then the physics heuristic

use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::physics::physics_estimate;
use crate::config::{ModelConfig, ScalingFailurePolicy};
use crate::domain::{PredictionMethod, RawObservation};
use crate::features::{overlap, FeatureAligner, FeatureError, FeatureSchema, FeatureSynthesizer};
use crate::ml::{FeatureVector, LoadedModel};

/// Position in the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Enhanced,
    Basic,
    PhysicsHeuristic,
}

impl Stage {
    /// Stage tried after this one fails. The heuristic never fails.
    pub fn next(self) -> Stage {
        match self {
            Stage::Enhanced => Stage::Basic,
            Stage::Basic | Stage::PhysicsHeuristic => Stage::PhysicsHeuristic,
        }
    }

    pub fn method(self) -> PredictionMethod {
        match self {
            Stage::Enhanced => PredictionMethod::Enhanced,
            Stage::Basic => PredictionMethod::Basic,
            Stage::PhysicsHeuristic => PredictionMethod::PhysicsBased,
        }
    }
}

impl From<FeatureSchema> for Stage {
    fn from(schema: FeatureSchema) -> Self {
        match schema {
            FeatureSchema::Enhanced => Stage::Enhanced,
            FeatureSchema::Basic => Stage::Basic,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.method(), f)
    }
}

/// Why a model-backed stage could not produce a value
#[derive(Debug, Error)]
pub enum StageError {
    #[error("feature construction failed: {0}")]
    FeatureConstruction(#[from] FeatureError),

    #[error("only {found} expected features available, need at least {required}")]
    InsufficientOverlap { found: usize, required: usize },

    #[error("scaling failed: {0:#}")]
    Scaling(anyhow::Error),

    #[error("predictor failed: {0:#}")]
    Predictor(anyhow::Error),

    #[error("predictor returned no usable value")]
    EmptyPrediction,
}

/// Value produced by the chain, before clamping and rounding
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub value: f64,
    pub method: PredictionMethod,
    pub features_used: usize,
    pub defaulted: Vec<String>,
    /// Stages that failed on the way, in order
    pub failures: Vec<(Stage, String)>,
}

struct StageValue {
    value: f64,
    features_used: usize,
    defaulted: Vec<String>,
}

/// Runs the stages for one loaded model
pub struct FallbackChain {
    model: Arc<LoadedModel>,
    aligner: FeatureAligner,
    start: Stage,
    on_scaling_failure: ScalingFailurePolicy,
    min_basic_overlap: usize,
}

impl FallbackChain {
    pub fn new(model: Arc<LoadedModel>, cfg: &ModelConfig) -> Self {
        Self {
            model,
            aligner: FeatureAligner::default(),
            start: Stage::from(cfg.feature_schema),
            on_scaling_failure: cfg.on_scaling_failure,
            min_basic_overlap: cfg.min_basic_overlap,
        }
    }

    pub fn with_aligner(mut self, aligner: FeatureAligner) -> Self {
        self.aligner = aligner;
        self
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }

    /// Walk the chain until a stage produces a value. Always succeeds.
    pub fn run(&self, observation: &RawObservation, now: NaiveDateTime) -> ChainOutcome {
        let mut stage = self.start;
        let mut failures = Vec::new();

        loop {
            let attempt = match stage {
                Stage::Enhanced => self.model_stage(FeatureSchema::Enhanced, observation, now, None),
                Stage::Basic => self.model_stage(
                    FeatureSchema::Basic,
                    observation,
                    now,
                    Some(self.min_basic_overlap),
                ),
                Stage::PhysicsHeuristic => {
                    return ChainOutcome {
                        value: physics_estimate(observation),
                        method: PredictionMethod::PhysicsBased,
                        features_used: 0,
                        defaulted: Vec::new(),
                        failures,
                    };
                }
            };

            match attempt {
                Ok(produced) => {
                    return ChainOutcome {
                        value: produced.value,
                        method: stage.method(),
                        features_used: produced.features_used,
                        defaulted: produced.defaulted,
                        failures,
                    };
                }
                Err(e) => {
                    warn!(
                        stage = %stage,
                        next = %stage.next(),
                        error = %e,
                        expected_features = self.model.feature_count(),
                        "Prediction stage failed, degrading"
                    );
                    failures.push((stage, e.to_string()));
                    stage = stage.next();
                }
            }
        }
    }

    fn model_stage(
        &self,
        schema: FeatureSchema,
        observation: &RawObservation,
        now: NaiveDateTime,
        required_overlap: Option<usize>,
    ) -> Result<StageValue, StageError> {
        let features = FeatureSynthesizer::new(schema).synthesize(observation, now)?;
        let expected = &self.model.feature_names;

        if let Some(required) = required_overlap {
            let found = overlap(&features, expected);
            if found < required {
                return Err(StageError::InsufficientOverlap { found, required });
            }
        }

        let alignment = self.aligner.align(&features, expected);
        if !alignment.defaults.is_empty() {
            debug!(
                schema = %schema,
                expected = expected.len(),
                present = alignment.matched(),
                defaulted = ?alignment.defaulted_names(),
                "Filled missing model features with defaults"
            );
        }

        let input = self.scale(&alignment.vector)?;
        let predictions = self.model.model.predict(&[input.features]).map_err(|e| {
            debug!(
                schema = %schema,
                expected = expected.len(),
                present = alignment.matched(),
                model_width = ?self.model.model.n_features(),
                "Predictor rejected aligned vector"
            );
            StageError::Predictor(e)
        })?;

        let value = predictions
            .first()
            .copied()
            .filter(|v| v.is_finite())
            .ok_or(StageError::EmptyPrediction)?;

        Ok(StageValue {
            value,
            features_used: alignment.vector.len(),
            defaulted: alignment.defaulted_names(),
        })
    }

    fn scale(&self, vector: &FeatureVector) -> Result<FeatureVector, StageError> {
        let Some(scaler) = &self.model.scaler else {
            return Ok(vector.clone());
        };

        match scaler.transform(vector) {
            Ok(scaled) => Ok(scaled),
            Err(e) => match self.on_scaling_failure {
                ScalingFailurePolicy::Fallback => Err(StageError::Scaling(e)),
                ScalingFailurePolicy::Unscaled => {
                    warn!(error = %e, "Scaling failed, predicting on unscaled features");
                    Ok(vector.clone())
                }
            },
        }
    }
}
