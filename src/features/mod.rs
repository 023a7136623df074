//! Feature engineering for the generation models
//!
//! The trained bundles expect a named feature vector in a fixed order. This
//! module rebuilds those features at request time from one weather
//! observation and a timestamp, then aligns them to a bundle's schema:
//! - `synthesizer`: raw observation + timestamp -> named feature mapping
//! - `aligner`: named mapping -> ordered vector, with rule-driven defaults

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use thiserror::Error;

pub mod aligner;
pub mod synthesizer;

pub use aligner::*;
pub use synthesizer::*;

/// Guard added to denominators and to sqrt/log arguments
pub const EPSILON: f64 = 1e-6;

/// Named features of one observation, iterated in name order
pub type FeatureMap = BTreeMap<String, f64>;

/// Which feature set to synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureSchema {
    /// Full set: calendar, polynomial, interaction, ratio, cyclic, one-hot,
    /// binned and domain features
    Enhanced,
    /// Reduced set of raw values, a few squares/interactions and one-hot weather
    Basic,
}

/// Feature construction errors
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("Feature '{name}' is not finite ({value})")]
    NonFinite { name: String, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_labels() {
        assert_eq!(FeatureSchema::Enhanced.to_string(), "enhanced");
        assert_eq!("basic".parse::<FeatureSchema>().unwrap(), FeatureSchema::Basic);
    }
}
