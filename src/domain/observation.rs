use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Weather condition labels the trained bundles were fitted on.
///
/// Matching is case-sensitive, the same way the labels appear in the
/// feature names (`weather_Clear`, `weather_Rainy_solar`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
    IntoStaticStr,
)]
pub enum WeatherCondition {
    Clear,
    Sunny,
    Cloudy,
    Overcast,
    Rainy,
}

impl WeatherCondition {
    /// Parse a client label. Unknown labels ("Foggy") are not an error, they
    /// simply match no category.
    pub fn from_label(label: &str) -> Option<Self> {
        label.parse().ok()
    }

    /// All category labels in their fixed order
    pub fn labels() -> Vec<&'static str> {
        Self::iter().map(|w| w.into()).collect()
    }

    /// Share of the clear-sky irradiance assumed to reach the panels
    pub fn irradiance_factor(condition: Option<Self>) -> f64 {
        match condition {
            Some(WeatherCondition::Clear | WeatherCondition::Sunny) => 1.0,
            Some(WeatherCondition::Cloudy) => 0.4,
            _ => 0.2,
        }
    }
}

/// One weather observation as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Air temperature (Celsius)
    pub temperature_c: f64,
    /// Weather label exactly as received
    pub weather_label: String,
    /// Wind speed (m/s)
    pub wind_speed_ms: f64,
    /// Relative humidity (0-100%)
    pub humidity_percent: f64,
    /// Barometric pressure (hPa)
    pub pressure_hpa: f64,
    /// Global solar irradiance (W/m²)
    pub solar_irradiance_w_m2: f64,
}

impl RawObservation {
    pub fn new(
        temperature_c: f64,
        weather_label: impl Into<String>,
        wind_speed_ms: f64,
        humidity_percent: f64,
        pressure_hpa: f64,
        solar_irradiance_w_m2: f64,
    ) -> Self {
        Self {
            temperature_c,
            weather_label: weather_label.into(),
            wind_speed_ms,
            humidity_percent,
            pressure_hpa,
            solar_irradiance_w_m2,
        }
    }

    /// Parsed weather category, `None` for labels outside the fixed set
    pub fn weather(&self) -> Option<WeatherCondition> {
        WeatherCondition::from_label(&self.weather_label)
    }

    /// Numeric inputs keyed by the names the bundles use
    pub fn numeric_inputs(&self) -> [(&'static str, f64); 5] {
        [
            ("temp", self.temperature_c),
            ("wind", self.wind_speed_ms),
            ("humidity", self.humidity_percent),
            ("barometer", self.pressure_hpa),
            ("solar_irradiance", self.solar_irradiance_w_m2),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_labels_are_case_sensitive() {
        assert_eq!(WeatherCondition::from_label("Clear"), Some(WeatherCondition::Clear));
        assert_eq!(WeatherCondition::from_label("clear"), None);
        assert_eq!(WeatherCondition::from_label("Foggy"), None);
    }

    #[test]
    fn test_labels_order() {
        assert_eq!(
            WeatherCondition::labels(),
            vec!["Clear", "Sunny", "Cloudy", "Overcast", "Rainy"]
        );
        assert_eq!(WeatherCondition::Overcast.to_string(), "Overcast");
    }

    #[test]
    fn test_irradiance_factor() {
        assert_eq!(WeatherCondition::irradiance_factor(Some(WeatherCondition::Sunny)), 1.0);
        assert_eq!(WeatherCondition::irradiance_factor(Some(WeatherCondition::Cloudy)), 0.4);
        assert_eq!(WeatherCondition::irradiance_factor(Some(WeatherCondition::Rainy)), 0.2);
        assert_eq!(WeatherCondition::irradiance_factor(None), 0.2);
    }
}
