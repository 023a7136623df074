use std::sync::Arc;

use crate::predictor::PredictionService;

/// Shared handler state. The model is loaded once and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
