use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::observation::{RawObservation, WeatherCondition};

/// Strategy of the fallback chain that produced a generation value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionMethod {
    Enhanced,
    Basic,
    PhysicsBased,
}

impl PredictionMethod {
    /// Confidence assigned before any held-out accuracy is taken into account
    pub fn base_confidence(self) -> u8 {
        match self {
            PredictionMethod::Enhanced => 85,
            PredictionMethod::Basic => 75,
            PredictionMethod::PhysicsBased => 60,
        }
    }
}

/// Rough split of a total generation figure into sources.
///
/// This is a presentation estimate computed from the raw inputs. It is not a
/// decomposition of what the regression model weighted internally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationBreakdown {
    pub solar: f64,
    pub wind: f64,
    pub backup: f64,
    /// (solar + wind) / total in percent, 0 when total is 0
    pub renewable_share_percent: f64,
}

impl GenerationBreakdown {
    /// Estimate the breakdown of `total` (already rounded to 2 decimals).
    ///
    /// Every component is non-negative and `solar + wind + backup == total`
    /// up to rounding.
    pub fn estimate(total: f64, observation: &RawObservation) -> Self {
        let total = total.max(0.0);
        let weather_factor = WeatherCondition::irradiance_factor(observation.weather());

        let solar_raw = (observation.solar_irradiance_w_m2 / 1000.0) * 50.0 * weather_factor;
        let wind_raw = if observation.wind_speed_ms > 3.0 {
            observation.wind_speed_ms * 2.5
        } else {
            0.0
        };

        let solar = round2(solar_raw.min(0.6 * total).max(0.0));
        let wind = round2(wind_raw.min(0.4 * total).max(0.0));
        let backup = round2((total - solar - wind).max(0.0));

        let renewable_share_percent = if total > 0.0 {
            round2(((solar + wind) / total * 100.0).clamp(0.0, 100.0))
        } else {
            0.0
        };

        Self {
            solar,
            wind,
            backup,
            renewable_share_percent,
        }
    }

    pub fn total(&self) -> f64 {
        self.solar + self.wind + self.backup
    }
}

/// Outcome of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Non-negative generation, rounded to 2 decimals
    pub predicted_generation: f64,
    pub method: PredictionMethod,
    /// Heuristic confidence in [0, 100]
    pub confidence: u8,
    pub breakdown: GenerationBreakdown,
    /// Length of the vector handed to the model (0 for the physics estimate)
    pub features_used: usize,
    /// Expected features that were filled by a default rule
    pub defaulted_features: Vec<String>,
    /// Timestamp the calendar features were derived from
    pub timestamp: NaiveDateTime,
}

/// Round to 2 decimal places. Values too large to scale are returned as is.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        value
    }
}
