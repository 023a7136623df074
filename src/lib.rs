//! Power Generation Predictor
//!
//! Serves renewable generation estimates for a single weather observation.
//! A regression bundle trained offline is loaded once at startup; requests
//! are turned into the bundle's feature schema and degrade through a
//! fallback chain down to a physics heuristic when the model cannot be used.

pub mod api;
pub mod config;
pub mod domain;
pub mod features;
pub mod ml;
pub mod predictor;
pub mod state;
pub mod telemetry;
