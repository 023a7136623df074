use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::domain::{GenerationBreakdown, PredictionMethod};
use crate::predictor::{PredictError, PredictionRequest};
use crate::state::AppState;

/// Successful prediction body
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    success: bool,
    predicted_generation: f64,
    method: PredictionMethod,
    confidence: u8,
    breakdown: GenerationBreakdown,
    model_type: String,
    feature_count: usize,
    features_used: usize,
    defaulted_features: Vec<String>,
    timestamp: NaiveDateTime,
    input: PredictionRequest,
}

/// POST /api/predict
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let model = state.service.model().ok_or(PredictError::ModelNotLoaded)?;
    let Json(request) = body?;

    let result = state.service.predict(&request)?;

    Ok(Json(PredictResponse {
        success: true,
        predicted_generation: result.predicted_generation,
        method: result.method,
        confidence: result.confidence,
        breakdown: result.breakdown,
        model_type: model.model_type.clone(),
        feature_count: model.feature_count(),
        features_used: result.features_used,
        defaulted_features: result.defaulted_features,
        timestamp: result.timestamp,
        input: request,
    }))
}
