//! Request-time feature synthesis
//!
//! Rebuilds the derived features the offline models were trained on. The
//! timestamp is a parameter so that identical inputs at an identical time
//! always produce identical features.

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;
use strum::IntoEnumIterator;

use super::{FeatureError, FeatureMap, FeatureSchema, EPSILON};
use crate::domain::{RawObservation, WeatherCondition};

/// Cut-in wind speed (m/s) below which turbines produce nothing
pub const WIND_CUT_IN_MS: f64 = 3.0;
/// Wind speed (m/s) at which turbines reach rated power
pub const WIND_RATED_MS: f64 = 12.0;
/// Cut-out wind speed (m/s) at which turbines shut down
pub const WIND_CUT_OUT_MS: f64 = 25.0;

/// Air density at sea level (kg/m³)
const AIR_DENSITY: f64 = 1.225;
/// PV output loss per degree above 25°C
const PV_TEMP_COEFFICIENT: f64 = 0.004;

/// Feature synthesizer for one schema
#[derive(Debug, Clone, Copy)]
pub struct FeatureSynthesizer {
    schema: FeatureSchema,
}

impl FeatureSynthesizer {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Synthesize the feature mapping for an observation at `now`.
    ///
    /// Fails when any derived value is not finite, e.g. the log of a negative
    /// irradiance.
    pub fn synthesize(
        &self,
        observation: &RawObservation,
        now: NaiveDateTime,
    ) -> Result<FeatureMap, FeatureError> {
        let mut features = FeatureMap::new();
        let inputs = Inputs::from(observation);

        for (name, value) in observation.numeric_inputs() {
            features.insert(name.to_string(), value);
        }

        match self.schema {
            FeatureSchema::Enhanced => {
                add_calendar_features(&mut features, now);
                add_polynomial_features(&mut features, &inputs);
                add_interaction_features(&mut features, &inputs);
                add_ratio_features(&mut features, &inputs);
                add_cyclic_features(&mut features, now);
                add_weather_features(&mut features, &inputs, observation.weather());
                add_binned_features(&mut features, &inputs);
                add_domain_features(&mut features, &inputs, now);
            }
            FeatureSchema::Basic => add_basic_features(&mut features, &inputs, observation.weather(), now),
        }

        ensure_finite(features)
    }
}

/// Numeric inputs under short names
struct Inputs {
    temp: f64,
    wind: f64,
    humidity: f64,
    barometer: f64,
    solar: f64,
}

impl From<&RawObservation> for Inputs {
    fn from(obs: &RawObservation) -> Self {
        Self {
            temp: obs.temperature_c,
            wind: obs.wind_speed_ms,
            humidity: obs.humidity_percent,
            barometer: obs.pressure_hpa,
            solar: obs.solar_irradiance_w_m2,
        }
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn set(features: &mut FeatureMap, name: &str, value: f64) {
    features.insert(name.to_string(), value);
}

fn ensure_finite(features: FeatureMap) -> Result<FeatureMap, FeatureError> {
    if let Some((name, value)) = features.iter().find(|(_, v)| !v.is_finite()) {
        return Err(FeatureError::NonFinite {
            name: name.clone(),
            value: *value,
        });
    }
    Ok(features)
}

fn add_basic_features(
    features: &mut FeatureMap,
    x: &Inputs,
    weather: Option<WeatherCondition>,
    now: NaiveDateTime,
) {
    let day_of_week = now.weekday().num_days_from_monday();

    set(features, "hour", now.hour() as f64);
    set(features, "day_of_week", day_of_week as f64);
    set(features, "month", now.month() as f64);
    set(features, "is_weekend", flag(day_of_week >= 5));

    set(features, "temp_squared", x.temp.powi(2));
    set(features, "wind_squared", x.wind.powi(2));
    set(features, "solar_squared", x.solar.powi(2));
    set(features, "temp_solar", x.temp * x.solar);
    set(features, "wind_solar", x.wind * x.solar);

    for condition in WeatherCondition::iter() {
        let name = format!("weather_{}", condition.as_ref());
        set(features, &name, flag(weather == Some(condition)));
    }

    set(features, "wind_power_factor", wind_power_factor(x.wind));
}

fn add_calendar_features(features: &mut FeatureMap, now: NaiveDateTime) {
    let day_of_week = now.weekday().num_days_from_monday();

    set(features, "hour", now.hour() as f64);
    set(features, "day_of_week", day_of_week as f64);
    set(features, "month", now.month() as f64);
    set(features, "day_of_year", now.ordinal() as f64);
    set(features, "week_of_year", now.iso_week().week() as f64);
    set(features, "is_weekend", flag(day_of_week >= 5));
    set(features, "is_weekday", flag(day_of_week < 5));
    set(features, "is_monday", flag(day_of_week == 0));
    set(features, "is_friday", flag(day_of_week == 4));
    set(features, "is_sunday", flag(day_of_week == 6));
}

fn add_polynomial_features(features: &mut FeatureMap, x: &Inputs) {
    for (base, value) in [
        ("temp", x.temp),
        ("wind", x.wind),
        ("solar", x.solar),
        ("humidity", x.humidity),
    ] {
        set(features, &format!("{base}_squared"), value.powi(2));
        set(features, &format!("{base}_cubed"), value.powi(3));
        set(features, &format!("{base}_fourth"), value.powi(4));
    }

    set(features, "solar_sqrt", (x.solar + EPSILON).sqrt());
    set(features, "solar_log", (x.solar + EPSILON).ln());
    set(features, "wind_log", (x.wind + EPSILON).ln());
}

fn add_interaction_features(features: &mut FeatureMap, x: &Inputs) {
    set(features, "temp_solar", x.temp * x.solar);
    set(features, "temp_wind", x.temp * x.wind);
    set(features, "temp_humidity", x.temp * x.humidity);
    set(features, "wind_solar", x.wind * x.solar);
    set(features, "wind_humidity", x.wind * x.humidity);
    set(features, "solar_humidity", x.solar * x.humidity);
    set(features, "barometer_wind", x.barometer * x.wind);
    set(features, "barometer_temp", x.barometer * x.temp);
    set(features, "barometer_solar", x.barometer * x.solar);
    set(features, "barometer_humidity", x.barometer * x.humidity);

    set(features, "temp_wind_solar", x.temp * x.wind * x.solar);
    set(features, "temp_humidity_solar", x.temp * x.humidity * x.solar);
    set(features, "wind_humidity_barometer", x.wind * x.humidity * x.barometer);
}

fn add_ratio_features(features: &mut FeatureMap, x: &Inputs) {
    set(features, "solar_humidity_ratio", x.solar / (x.humidity + EPSILON));
    set(features, "wind_humidity_ratio", x.wind / (x.humidity + EPSILON));
    set(features, "temp_humidity_ratio", x.temp / (x.humidity + EPSILON));
    set(features, "solar_wind_ratio", x.solar / (x.wind + EPSILON));
    set(features, "barometer_humidity_ratio", x.barometer / (x.humidity + EPSILON));
}

fn add_cyclic_features(features: &mut FeatureMap, now: NaiveDateTime) {
    let cycles = [
        ("hour", now.hour() as f64, 24.0),
        ("day_of_year", now.ordinal() as f64, 365.0),
        ("month", now.month() as f64, 12.0),
        ("day_of_week", now.weekday().num_days_from_monday() as f64, 7.0),
    ];

    for (name, value, period) in cycles {
        let angle = 2.0 * PI * value / period;
        set(features, &format!("{name}_sin"), angle.sin());
        set(features, &format!("{name}_cos"), angle.cos());
    }
}

fn add_weather_features(features: &mut FeatureMap, x: &Inputs, weather: Option<WeatherCondition>) {
    for condition in WeatherCondition::iter() {
        let label = condition.as_ref();
        let active = weather == Some(condition);
        let gate = |value: f64| if active { value } else { 0.0 };

        set(features, &format!("weather_{label}"), flag(active));
        set(features, &format!("weather_{label}_solar"), gate(x.solar));
        set(features, &format!("weather_{label}_temp"), gate(x.temp));
        set(features, &format!("weather_{label}_wind"), gate(x.wind));
        set(features, &format!("weather_{label}_humidity"), gate(x.humidity));
    }
}

/// Bucket index of `value` for buckets of `width` starting at `origin`,
/// clamped to `[0, max_bucket]`
pub fn bucket(value: f64, origin: f64, width: f64, max_bucket: i32) -> f64 {
    let index = ((value - origin) / width).floor();
    index.clamp(0.0, max_bucket as f64)
}

fn add_binned_features(features: &mut FeatureMap, x: &Inputs) {
    set(features, "temp_bin", bucket(x.temp, -20.0, 5.0, 12));
    set(features, "wind_bin", bucket(x.wind, 0.0, 2.0, 12));
    set(features, "humidity_bin", bucket(x.humidity, 0.0, 10.0, 9));
    set(features, "solar_bin", bucket(x.solar, 0.0, 100.0, 12));
    set(features, "barometer_bin", bucket(x.barometer, 950.0, 10.0, 10));
}

fn add_domain_features(features: &mut FeatureMap, x: &Inputs, now: NaiveDateTime) {
    let hour = now.hour();
    let month = now.month();
    let derating = temperature_derating(x.temp);
    let elevation = solar_elevation_proxy(hour);

    set(features, "temp_derating", derating);
    set(features, "solar_efficiency", x.solar * derating);
    set(features, "wind_power_factor", wind_power_factor(x.wind));
    set(features, "wind_power_density", 0.5 * AIR_DENSITY * x.wind.powi(3));
    set(features, "solar_elevation_proxy", elevation);
    set(features, "solar_potential", x.solar * elevation);
    set(features, "peak_solar_hours", flag((10..=15).contains(&hour)));
    set(features, "is_daylight", flag((6..=18).contains(&hour)));

    let season = season(month);
    set(features, "season", season as f64);
    set(features, "is_winter", flag(season == 0));
    set(features, "is_spring", flag(season == 1));
    set(features, "is_summer", flag(season == 2));
    set(features, "is_autumn", flag(season == 3));

    let optimal_solar = x.solar > 600.0 && (15.0..=30.0).contains(&x.temp) && x.humidity < 70.0;
    let optimal_wind = (8.0..=20.0).contains(&x.wind);
    set(features, "optimal_solar_conditions", flag(optimal_solar));
    set(features, "optimal_wind_conditions", flag(optimal_wind));
    set(features, "optimal_conditions", flag(optimal_solar && optimal_wind));
}

/// Normalized turbine output for a wind speed.
///
/// Zero below cut-in, cubic ramp up to rated speed, flat at 1 until cut-out,
/// zero from cut-out on.
pub fn wind_power_factor(wind_ms: f64) -> f64 {
    if wind_ms < WIND_CUT_IN_MS {
        0.0
    } else if wind_ms < WIND_RATED_MS {
        ((wind_ms - WIND_CUT_IN_MS) / (WIND_RATED_MS - WIND_CUT_IN_MS))
            .powi(3)
            .min(1.0)
    } else if wind_ms < WIND_CUT_OUT_MS {
        1.0
    } else {
        0.0
    }
}

/// PV derating for cell temperatures above 25°C
pub fn temperature_derating(temp_c: f64) -> f64 {
    1.0 - PV_TEMP_COEFFICIENT * (temp_c - 25.0).max(0.0)
}

/// Sinusoidal sun-height proxy: 0 at 06:00 and 18:00, 1 at noon, 0 at night
pub fn solar_elevation_proxy(hour: u32) -> f64 {
    if (6..=18).contains(&hour) {
        (PI * (hour as f64 - 6.0) / 12.0).sin().max(0.0)
    } else {
        0.0
    }
}

/// Season from month (0=winter, 1=spring, 2=summer, 3=autumn)
pub fn season(month: u32) -> u32 {
    match month {
        12 | 1 | 2 => 0,
        3..=5 => 1,
        6..=8 => 2,
        9..=11 => 3,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 30, 0)
            .unwrap()
    }

    fn clear_day() -> RawObservation {
        RawObservation::new(25.0, "Clear", 8.0, 60.0, 1013.0, 800.0)
    }

    #[test]
    fn test_enhanced_passthrough_and_calendar() {
        // 2024-06-21 is a Friday
        let features = FeatureSynthesizer::new(FeatureSchema::Enhanced)
            .synthesize(&clear_day(), at(2024, 6, 21, 12))
            .unwrap();

        assert_eq!(features["temp"], 25.0);
        assert_eq!(features["barometer"], 1013.0);
        assert_eq!(features["solar_irradiance"], 800.0);
        assert_eq!(features["hour"], 12.0);
        assert_eq!(features["day_of_week"], 4.0);
        assert_eq!(features["is_friday"], 1.0);
        assert_eq!(features["is_weekend"], 0.0);
        assert_eq!(features["is_weekday"], 1.0);
        assert_eq!(features["month"], 6.0);
        assert_eq!(features["day_of_year"], 173.0);
        assert_eq!(features["week_of_year"], 25.0);
        assert_eq!(features["is_summer"], 1.0);
        assert_eq!(features["season"], 2.0);
    }

    #[test]
    fn test_enhanced_derived_values() {
        let features = FeatureSynthesizer::new(FeatureSchema::Enhanced)
            .synthesize(&clear_day(), at(2024, 6, 21, 12))
            .unwrap();

        assert_eq!(features["temp_squared"], 625.0);
        assert_eq!(features["wind_cubed"], 512.0);
        assert_eq!(features["humidity_fourth"], 60.0_f64.powi(4));
        assert_eq!(features["temp_wind_solar"], 25.0 * 8.0 * 800.0);
        assert!((features["solar_humidity_ratio"] - 800.0 / 60.0).abs() < 1e-6);
        assert!((features["hour_cos"] + 1.0).abs() < 1e-12);
        assert_eq!(features["solar_elevation_proxy"], 1.0);
        assert_eq!(features["peak_solar_hours"], 1.0);
        assert_eq!(features["temp_derating"], 1.0);
        assert_eq!(features["solar_efficiency"], 800.0);
        assert_eq!(features["optimal_solar_conditions"], 1.0);
        assert_eq!(features["optimal_wind_conditions"], 1.0);
        assert_eq!(features["optimal_conditions"], 1.0);
        assert_eq!(features["temp_bin"], 9.0);
        assert_eq!(features["solar_bin"], 8.0);
        assert_eq!(features["barometer_bin"], 6.0);
    }

    #[test]
    fn test_weather_one_hot_and_gated_interactions() {
        let features = FeatureSynthesizer::new(FeatureSchema::Enhanced)
            .synthesize(&clear_day(), at(2024, 6, 21, 12))
            .unwrap();

        assert_eq!(features["weather_Clear"], 1.0);
        assert_eq!(features["weather_Clear_solar"], 800.0);
        assert_eq!(features["weather_Clear_temp"], 25.0);
        for label in ["Sunny", "Cloudy", "Overcast", "Rainy"] {
            assert_eq!(features[&format!("weather_{label}")], 0.0);
            assert_eq!(features[&format!("weather_{label}_solar")], 0.0);
            assert_eq!(features[&format!("weather_{label}_wind")], 0.0);
        }
    }

    #[test]
    fn test_unknown_weather_zeroes_every_category() {
        let foggy = RawObservation::new(12.0, "Foggy", 4.0, 90.0, 1002.0, 150.0);
        let features = FeatureSynthesizer::new(FeatureSchema::Enhanced)
            .synthesize(&foggy, at(2024, 11, 3, 9))
            .unwrap();

        let weather_sum: f64 = features
            .iter()
            .filter(|(name, _)| name.starts_with("weather_"))
            .map(|(_, value)| *value)
            .sum();
        assert_eq!(weather_sum, 0.0);
    }

    #[test]
    fn test_basic_is_a_small_subset() {
        let now = at(2024, 1, 6, 8);
        let basic = FeatureSynthesizer::new(FeatureSchema::Basic)
            .synthesize(&clear_day(), now)
            .unwrap();
        let enhanced = FeatureSynthesizer::new(FeatureSchema::Enhanced)
            .synthesize(&clear_day(), now)
            .unwrap();

        assert_eq!(basic.len(), 20);
        assert!(basic.len() < enhanced.len());
        for (name, value) in &basic {
            assert_eq!(enhanced.get(name), Some(value), "feature {name}");
        }
        assert_eq!(basic["is_weekend"], 1.0);
    }

    #[test]
    fn test_negative_irradiance_fails_enhanced_only() {
        let obs = RawObservation::new(20.0, "Cloudy", 5.0, 50.0, 1010.0, -10.0);
        let now = at(2024, 3, 1, 10);

        let err = FeatureSynthesizer::new(FeatureSchema::Enhanced)
            .synthesize(&obs, now)
            .unwrap_err();
        assert!(matches!(err, FeatureError::NonFinite { ref name, .. } if name == "solar_log" || name == "solar_sqrt"));

        assert!(FeatureSynthesizer::new(FeatureSchema::Basic)
            .synthesize(&obs, now)
            .is_ok());
    }

    #[test]
    fn test_zero_irradiance_is_guarded() {
        let night = RawObservation::new(10.0, "Clear", 0.0, 80.0, 1020.0, 0.0);
        let features = FeatureSynthesizer::new(FeatureSchema::Enhanced)
            .synthesize(&night, at(2024, 2, 10, 23))
            .unwrap();

        assert!(features["solar_sqrt"] > 0.0);
        assert!(features["solar_log"].is_finite());
        assert_eq!(features["solar_elevation_proxy"], 0.0);
        assert_eq!(features["is_daylight"], 0.0);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(2.99, 0.0)]
    #[case(3.0, 0.0)]
    #[case(7.5, 0.125)]
    #[case(12.0, 1.0)]
    #[case(24.99, 1.0)]
    #[case(25.0, 0.0)]
    #[case(40.0, 0.0)]
    fn test_wind_power_curve(#[case] wind: f64, #[case] expected: f64) {
        assert!((wind_power_factor(wind) - expected).abs() < 1e-12);
    }

    #[rstest]
    #[case(-25.0, 0.0)]
    #[case(-20.0, 0.0)]
    #[case(0.0, 4.0)]
    #[case(100.0, 12.0)]
    fn test_temperature_bucket_clamps(#[case] temp: f64, #[case] expected: f64) {
        assert_eq!(bucket(temp, -20.0, 5.0, 12), expected);
    }

    #[test]
    fn test_season_calculation() {
        assert_eq!(season(1), 0);
        assert_eq!(season(4), 1);
        assert_eq!(season(7), 2);
        assert_eq!(season(10), 3);
        assert_eq!(season(12), 0);
    }

    #[test]
    fn test_solar_elevation_proxy() {
        assert_eq!(solar_elevation_proxy(3), 0.0);
        assert!(solar_elevation_proxy(6).abs() < 1e-12);
        assert_eq!(solar_elevation_proxy(12), 1.0);
        assert!(solar_elevation_proxy(18).abs() < 1e-12);
        assert_eq!(solar_elevation_proxy(21), 0.0);
    }

    proptest! {
        #[test]
        fn prop_synthesis_is_deterministic(
            temp in -30.0f64..50.0,
            wind in 0.0f64..40.0,
            humidity in 0.0f64..100.0,
            pressure in 950.0f64..1060.0,
            solar in 0.0f64..1400.0,
            weather in prop::sample::select(vec!["Clear", "Sunny", "Cloudy", "Overcast", "Rainy", "Foggy"]),
            day in 0i64..366,
            hour in 0u32..24,
        ) {
            let obs = RawObservation::new(temp, weather, wind, humidity, pressure, solar);
            let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                .and_hms_opt(hour, 0, 0).unwrap()
                + chrono::Duration::days(day);

            for schema in [FeatureSchema::Enhanced, FeatureSchema::Basic] {
                let synthesizer = FeatureSynthesizer::new(schema);
                let first = synthesizer.synthesize(&obs, now);
                let second = synthesizer.synthesize(&obs, now);
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn prop_wind_curve_is_monotonic_on_ramp(a in 3.0f64..12.0, b in 3.0f64..12.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(wind_power_factor(lo) <= wind_power_factor(hi));
        }

        #[test]
        fn prop_wind_curve_plateau_and_cutoffs(
            calm in 0.0f64..3.0,
            rated in 12.0f64..25.0,
            storm in 25.0f64..80.0,
        ) {
            prop_assert_eq!(wind_power_factor(calm), 0.0);
            prop_assert_eq!(wind_power_factor(rated), 1.0);
            prop_assert_eq!(wind_power_factor(storm), 0.0);
        }
    }
}
