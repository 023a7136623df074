use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::clock::Clock;
use super::confidence::confidence_score;
use super::fallback::FallbackChain;
use crate::config::ModelConfig;
use crate::domain::{round2, GenerationBreakdown, PredictionResult, RawObservation};
use crate::features::FeatureSchema;
use crate::ml::LoadedModel;

/// Client-facing prediction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredictError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Prediction request as received; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub temperature: Option<f64>,
    pub weather: Option<String>,
    pub wind: Option<f64>,
    pub humidity: Option<f64>,
    pub barometer: Option<f64>,
    pub solar_irradiance: Option<f64>,
}

impl PredictionRequest {
    /// Check required fields in order; the first absent one is reported
    pub fn validate(&self) -> Result<RawObservation, PredictError> {
        let temperature = self.temperature.ok_or(PredictError::MissingField("temperature"))?;
        let weather = self
            .weather
            .clone()
            .ok_or(PredictError::MissingField("weather"))?;
        let wind = self.wind.ok_or(PredictError::MissingField("wind"))?;
        let humidity = self.humidity.ok_or(PredictError::MissingField("humidity"))?;
        let barometer = self.barometer.ok_or(PredictError::MissingField("barometer"))?;
        let solar = self
            .solar_irradiance
            .ok_or(PredictError::MissingField("solar_irradiance"))?;

        Ok(RawObservation::new(temperature, weather, wind, humidity, barometer, solar))
    }
}

impl From<&RawObservation> for PredictionRequest {
    fn from(obs: &RawObservation) -> Self {
        Self {
            temperature: Some(obs.temperature_c),
            weather: Some(obs.weather_label.clone()),
            wind: Some(obs.wind_speed_ms),
            humidity: Some(obs.humidity_percent),
            barometer: Some(obs.pressure_hpa),
            solar_irradiance: Some(obs.solar_irradiance_w_m2),
        }
    }
}

/// Serves predictions from the model loaded at startup, if any
pub struct PredictionService {
    chain: Option<FallbackChain>,
    schema: FeatureSchema,
    clock: Arc<dyn Clock>,
}

impl PredictionService {
    pub fn new(model: Option<LoadedModel>, cfg: &ModelConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            chain: model.map(|m| FallbackChain::new(Arc::new(m), cfg)),
            schema: cfg.feature_schema,
            clock,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.chain.is_some()
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.chain.as_ref().map(FallbackChain::model)
    }

    /// Schema the chain starts from
    pub fn feature_schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Predict generation for one request.
    ///
    /// Only a missing model or a missing field is reported as an error; every
    /// other failure degrades through the fallback chain.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        let chain = self.chain.as_ref().ok_or(PredictError::ModelNotLoaded)?;
        let observation = request.validate()?;
        let now = self.clock.now();

        let outcome = chain.run(&observation, now);
        let predicted_generation = round2(non_negative_finite(outcome.value));
        let breakdown = GenerationBreakdown::estimate(predicted_generation, &observation);
        let confidence = confidence_score(outcome.method, chain.model().held_out_r2());

        info!(
            method = %outcome.method,
            predicted_generation,
            confidence,
            features_used = outcome.features_used,
            defaulted = outcome.defaulted.len(),
            "Prediction served"
        );

        Ok(PredictionResult {
            predicted_generation,
            method: outcome.method,
            confidence,
            breakdown,
            features_used: outcome.features_used,
            defaulted_features: outcome.defaulted,
            timestamp: now,
        })
    }
}

/// Clamp into `[0, f64::MAX]`; NaN becomes 0
fn non_negative_finite(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, f64::MAX)
    }
}
