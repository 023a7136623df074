use anyhow::Result;
use power_generation_predictor::{api, config, ml, predictor, state, telemetry};
use config::Config;
use ml::ArtifactLoader;
use predictor::{PredictionService, SystemClock};
use state::AppState;
use std::sync::Arc;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(&cfg.logging);

    let model = match ArtifactLoader::from_config(&cfg.model).load() {
        Ok(model) => Some(model),
        Err(e) => {
            warn!(error = %e, "Prediction unavailable until a model artifact is provided");
            None
        }
    };

    let service = PredictionService::new(model, &cfg.model, Arc::new(SystemClock));
    let app_state = AppState::new(service);
    let app = api::router(app_state, &cfg);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("Server binding to 0.0.0.0 - service will be accessible from the network");
    }

    info!(%addr, schema = %cfg.model.feature_schema, "starting Power Generation Predictor");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
