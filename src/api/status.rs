use axum::{extract::State, Json};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::features::FeatureSchema;
use crate::ml::PerformanceMetrics;
use crate::state::AppState;

/// Service status response
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    model_loaded: bool,
    feature_count: usize,
    model_type: Option<String>,
    /// Performance metrics stored with the bundle
    model_info: PerformanceMetrics,
    artifact: Option<String>,
    feature_schema: FeatureSchema,
    status: &'static str,
    timestamp: NaiveDateTime,
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let service = &state.service;
    let model = service.model();

    Json(ServiceStatus {
        model_loaded: model.is_some(),
        feature_count: model.map(|m| m.feature_count()).unwrap_or(0),
        model_type: model.map(|m| m.model_type.clone()),
        model_info: model.map(|m| m.metrics.clone()).unwrap_or_default(),
        artifact: model.and_then(|m| m.artifact_name()),
        feature_schema: service.feature_schema(),
        status: "running",
        timestamp: service.clock().now(),
    })
}
