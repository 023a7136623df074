use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    checks: HealthChecks,
}

/// Individual health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    model: ComponentHealth,
}

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            error: Some(error),
        }
    }
}

fn check_model(state: &AppState) -> ComponentHealth {
    if state.service.is_ready() {
        ComponentHealth::healthy()
    } else {
        ComponentHealth::unhealthy("no model artifact loaded".to_string())
    }
}

/// GET /health
///
/// The process keeps serving without a model, so a missing model reports
/// "degraded" with 200 rather than failing the check.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let model_health = check_model(&state);
    let healthy = model_health.status == "healthy";

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now(),
        checks: HealthChecks {
            model: model_health,
        },
    };

    (StatusCode::OK, Json(response))
}

/// GET /health/ready - 200 once a model is loaded
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.service.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
