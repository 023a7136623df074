use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::features::FeatureSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 30,
            enable_cors: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// What to do when the scaler rejects an aligned vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingFailurePolicy {
    /// Treat it as a failed stage and move down the fallback chain
    #[default]
    Fallback,
    /// Predict on the unscaled vector
    Unscaled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory the candidate artifacts are looked up in
    pub directory: PathBuf,
    /// Artifact file names in priority order
    pub candidates: Vec<String>,
    /// First feature schema the fallback chain tries
    pub feature_schema: FeatureSchema,
    pub on_scaling_failure: ScalingFailurePolicy,
    /// Minimum expected features the basic schema must supply
    pub min_basic_overlap: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            candidates: vec![
                "best_power_generation_model.json".to_string(),
                "improved_power_generation_model.json".to_string(),
                "power_generation_model.json".to_string(),
            ],
            feature_schema: FeatureSchema::Enhanced,
            on_scaling_failure: ScalingFailurePolicy::Fallback,
            min_basic_overlap: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::figment("config/default.toml")
    }

    /// Defaults, then `path` if it exists, then `PGP__`-prefixed env vars
    pub fn figment(path: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PGP__").split("__"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.model.candidates.len(), 3);
        assert_eq!(cfg.model.candidates[0], "best_power_generation_model.json");
        assert_eq!(cfg.model.min_basic_overlap, 5);
        assert_eq!(cfg.model.feature_schema, FeatureSchema::Enhanced);
        assert_eq!(cfg.model.on_scaling_failure, ScalingFailurePolicy::Fallback);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.socket_addr().unwrap().port(), 5000);
    }

    #[test]
    fn test_layering_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "pgp.toml",
                r#"
                [server]
                port = 8080

                [model]
                feature_schema = "basic"
                on_scaling_failure = "unscaled"
                "#,
            )?;
            jail.set_env("PGP__MODEL__MIN_BASIC_OVERLAP", "7");

            let cfg = Config::figment("pgp.toml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.port, 8080);
            assert_eq!(cfg.server.host, "127.0.0.1");
            assert_eq!(cfg.model.feature_schema, FeatureSchema::Basic);
            assert_eq!(cfg.model.on_scaling_failure, ScalingFailurePolicy::Unscaled);
            assert_eq!(cfg.model.min_basic_overlap, 7);
            Ok(())
        });
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped: Config = Figment::new()
            .merge(Toml::file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")))
            .extract()
            .unwrap();
        let defaults = Config::default();

        assert!(!shipped.server.enable_cors);
        assert_eq!(shipped.server.enable_cors, defaults.server.enable_cors);
        assert_eq!(shipped.server.port, defaults.server.port);
        assert_eq!(shipped.model.candidates, defaults.model.candidates);
        assert_eq!(shipped.model.min_basic_overlap, defaults.model.min_basic_overlap);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        figment::Jail::expect_with(|_| {
            let cfg = Config::figment("does-not-exist.toml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.model.directory, PathBuf::from("."));
            Ok(())
        });
    }
}
