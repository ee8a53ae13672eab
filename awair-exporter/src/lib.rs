//! Prometheus metrics exporter for Awair air-quality sensors.
//!
//! This crate polls a sensor's local API (`GET /air-data/latest`) on a fixed
//! interval and exposes the latest reading via an HTTP `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Awair sensor   │────>│    Collector    │────>│   HTTP Server   │
//! │ (/air-data/...) │     │  (gauge set)    │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!          ^                       ^
//!          └──────── Poller ───────┘
//! ```
//!
//! A failed fetch leaves the previous gauge values in place. Freshness can be
//! tracked through `awair_last_success_timestamp_seconds`.
//!
//! # Usage
//!
//! ```bash
//! AWAIR_HOST=192.168.1.50 awair-exporter
//! awair-exporter --config awair.json5 --listen 0.0.0.0:9101
//! ```
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod client;
pub mod collector;
pub mod config;
pub mod http;
pub mod poller;
pub mod reading;

pub use client::{AwairClient, FetchError};
pub use collector::{AirQualityCollector, MetricDescriptor, SharedCollector};
pub use config::{ConfigError, ExporterConfig, LogFormat, LoggingConfig};
pub use http::{HttpServer, ServerError};
pub use poller::Poller;
pub use reading::AirData;

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?,
    }

    Ok(())
}
