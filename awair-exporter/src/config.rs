//! Configuration for the Awair exporter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::http::RESERVED_PATHS;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Sensor connection settings.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Refresh loop settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sensor connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor address, `host` or `host:port`. Usually taken from `AWAIR_HOST`.
    #[serde(default)]
    pub host: String,

    /// Value of the `location` label (default: "default").
    #[serde(default = "default_location")]
    pub location: String,

    /// Request timeout for a single fetch (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_location() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            location: default_location(),
            timeout_secs: default_timeout(),
        }
    }
}

impl SensorConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Refresh loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Time between sensor fetches (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    15
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

impl PollingConfig {
    /// Refresh interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// An empty sensor host is allowed: the exporter still serves its
    /// endpoint and every fetch fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "interval_secs must be > 0".to_string(),
            ));
        }

        if self.sensor.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.sensor.location.is_empty() {
            return Err(ConfigError::Validation(
                "location must not be empty".to_string(),
            ));
        }

        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if RESERVED_PATHS.contains(&self.prometheus.path.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} is already served by the exporter",
                self.prometheus.path
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.sensor.host, "");
        assert_eq!(config.sensor.location, "default");
        assert_eq!(config.sensor.timeout(), Duration::from_secs(10));
        assert_eq!(config.polling.interval(), Duration::from_secs(15));
        assert_eq!(config.prometheus.listen, "0.0.0.0:8080");
        assert_eq!(config.prometheus.path, "/metrics");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            sensor: {
                host: "192.168.1.50",
                location: "office",
                timeout_secs: 3,
            },
            polling: { interval_secs: 60 },
            prometheus: {
                listen: "127.0.0.1:9101",
                path: "/prometheus/metrics",
            },
            logging: {
                level: "debug",
                format: "json",
            },
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.sensor.host, "192.168.1.50");
        assert_eq!(config.sensor.location, "office");
        assert_eq!(config.sensor.timeout_secs, 3);
        assert_eq!(config.polling.interval_secs, 60);
        assert_eq!(config.prometheus.listen, "127.0.0.1:9101");
        assert_eq!(config.prometheus.path, "/prometheus/metrics");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ prometheus: { listen: "not-an-address" } }"#);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let result = ExporterConfig::parse(r#"{ prometheus: { path: "metrics" } }"#);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must start with /")
        );
    }

    #[test]
    fn test_validate_path_collides_with_builtin_routes() {
        for path in ["/health", "/ready"] {
            let json = format!(r#"{{ prometheus: {{ path: "{}" }} }}"#, path);
            let result = ExporterConfig::parse(&json);
            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("already served"),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_validate_zero_interval() {
        let result = ExporterConfig::parse("{ polling: { interval_secs: 0 } }");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let result = ExporterConfig::parse("{ sensor: { timeout_secs: 0 } }");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_empty_location() {
        let result = ExporterConfig::parse(r#"{ sensor: { location: "" } }"#);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = ExporterConfig::parse("{ sensor: ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ sensor: {{ host: "awair.local" }} }}"#).unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.sensor.host, "awair.local");
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = ExporterConfig::parse(include_str!("../awair.example.json5")).unwrap();
        assert_eq!(config.polling.interval_secs, 15);
        assert_eq!(config.prometheus.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/awair.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
