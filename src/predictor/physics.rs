//! Last-resort generation estimate that needs no model

use crate::domain::{RawObservation, WeatherCondition};

/// Lower bound of the heuristic estimate
pub const PHYSICS_FLOOR: f64 = 10.0;

/// Estimate generation from irradiance, wind and temperature alone.
///
/// `solar = irradiance/1000 * 50 * weather_factor`, `wind = 2.5 * speed`
/// above 3 m/s, scaled by `1 - 0.01 * |temp - 25|` and floored at 10.
pub fn physics_estimate(observation: &RawObservation) -> f64 {
    let weather_factor = WeatherCondition::irradiance_factor(observation.weather());

    let solar_component = (observation.solar_irradiance_w_m2 / 1000.0) * 50.0 * weather_factor;
    let wind_component = if observation.wind_speed_ms > 3.0 {
        observation.wind_speed_ms * 2.5
    } else {
        0.0
    };
    let temp_factor = 1.0 - 0.01 * (observation.temperature_c - 25.0).abs();

    ((solar_component + wind_component) * temp_factor).max(PHYSICS_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clear_day_estimate() {
        // solar 40, wind 20, temp factor 1.0
        let obs = RawObservation::new(25.0, "Clear", 8.0, 60.0, 1013.0, 800.0);
        assert!((physics_estimate(&obs) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_cloudy_and_hot() {
        // solar 0.5*50*0.4 = 10, wind 10*2.5 = 25, temp factor 0.9
        let obs = RawObservation::new(35.0, "Cloudy", 10.0, 40.0, 1005.0, 500.0);
        assert!((physics_estimate(&obs) - 31.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_weather_uses_low_factor() {
        // solar 1.0*50*0.2 = 10, calm wind
        let obs = RawObservation::new(25.0, "Foggy", 3.0, 95.0, 1000.0, 1000.0);
        assert_eq!(physics_estimate(&obs), PHYSICS_FLOOR);

        let obs = RawObservation::new(25.0, "Overcast", 3.0, 95.0, 1000.0, 2000.0);
        assert!((physics_estimate(&obs) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_at_night() {
        let obs = RawObservation::new(-5.0, "Clear", 1.0, 80.0, 1030.0, 0.0);
        assert_eq!(physics_estimate(&obs), PHYSICS_FLOOR);
    }

    proptest! {
        #[test]
        fn prop_estimate_never_below_floor(
            temp in -60.0f64..200.0,
            wind in -10.0f64..100.0,
            solar in -2000.0f64..3000.0,
            weather in prop::sample::select(vec!["Clear", "Sunny", "Cloudy", "Overcast", "Rainy", "Hail"]),
        ) {
            let obs = RawObservation::new(temp, weather, wind, 50.0, 1013.0, solar);
            prop_assert!(physics_estimate(&obs) >= PHYSICS_FLOOR);
        }
    }
}
