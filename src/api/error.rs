use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::predictor::PredictError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Model not loaded")]
    ModelNotLoaded,
}

/// Error body: `{success: false, error, error_type}`
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    error_type: &'static str,
    /// Set when the client should use its own estimate instead
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<bool>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::ModelNotLoaded => "ModelNotLoaded",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::ModelNotLoaded => {
                tracing::warn!("Prediction requested without a loaded model");
                self.to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            error_type: self.error_type(),
            fallback: matches!(self, ApiError::ModelNotLoaded).then_some(true),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(error: PredictError) -> Self {
        match error {
            PredictError::ModelNotLoaded => ApiError::ModelNotLoaded,
            PredictError::MissingField(_) => ApiError::ValidationError(error.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}
