//! Prediction service
//!
//! Wraps a loaded model bundle in a three-stage fallback chain so that a
//! request with all required fields always gets a generation figure:
//! 1. enhanced feature set through the model
//! 2. basic feature set through the model
//! 3. physics heuristic

pub mod clock;
pub mod confidence;
pub mod fallback;
pub mod physics;
pub mod service;

pub use clock::*;
pub use confidence::*;
pub use fallback::*;
pub use physics::*;
pub use service::*;
