//! Gauge set holding the latest sensor reading.
//!
//! Every reading field maps to one gauge family labeled by `location`. The
//! families live in a [`Registry`] that is built once at startup and only
//! read afterwards; individual gauge cells are atomics, so refreshes and
//! scrapes never block each other.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::{debug, warn};

use crate::client::{AwairClient, FetchError};
use crate::reading::AirData;

/// Label set attached to every reading gauge.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LocationLabels {
    pub location: String,
}

/// Label set for the refresh failure counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureLabels {
    pub location: String,
    pub reason: String,
}

/// Static identity of an exported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

type GaugeFamily = Family<LocationLabels, Gauge<f64, AtomicU64>>;

struct ReadingGauge {
    descriptor: MetricDescriptor,
    value: fn(&AirData) -> f64,
}

const LOCATION: &[&str] = &["location"];

const fn describe_gauge(name: &'static str, help: &'static str) -> MetricDescriptor {
    MetricDescriptor {
        name,
        help,
        labels: LOCATION,
    }
}

const READING_GAUGES: &[ReadingGauge] = &[
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_score",
            "Awair Score (0-100), overall summary of air quality",
        ),
        value: |d| d.score as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_dew_point_celsius",
            "The temperature at which water will condense and form into dew",
        ),
        value: |d| d.dew_point,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_temperature_celsius",
            "Current temperature in Celsius",
        ),
        value: |d| d.temp,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_humidity_relative",
            "Current relative humidity percentage, describes how saturated the air is with respect to water at a given temperature",
        ),
        value: |d| d.humid,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_humidity_absolute_grams_per_cubic_meter",
            "The amount of water vapor in the air (g/m³)",
        ),
        value: |d| d.abs_humid,
    },
    ReadingGauge {
        descriptor: describe_gauge("awair_co2_ppm", "Current CO2 levels in parts per million"),
        value: |d| d.co2 as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_co2_estimate_ppm",
            "Current estimated CO2 levels in parts per million, calculated by the TVOC sensor",
        ),
        value: |d| d.co2_est as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_co2_estimate_baseline",
            "A unitless value that represents the baseline from which the TVOC sensor partially derives its estimated CO2 output",
        ),
        value: |d| d.co2_est_baseline as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge("awair_voc_ppb", "Total Volatile Organic Compounds (ppb)"),
        value: |d| d.voc as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_voc_baseline",
            "A unitless value that represents the baseline from which the TVOC sensor partially derives its TVOC output",
        ),
        value: |d| d.voc_baseline as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_voc_hydrogen_raw",
            "A unitless value that represents the Hydrogen gas signal from which the TVOC sensor partially derives its TVOC output",
        ),
        value: |d| d.voc_h2_raw as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_voc_ethanol_raw",
            "A unitless value that represents the Ethanol gas signal from which the TVOC sensor partially derives its TVOC output",
        ),
        value: |d| d.voc_ethanol_raw as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_pm25_micrograms_per_cubic_meter",
            "Concentration of particulate matter less than 2.5 microns in diameter (µg/m³)",
        ),
        value: |d| d.pm25 as f64,
    },
    ReadingGauge {
        descriptor: describe_gauge(
            "awair_pm10_micrograms_per_cubic_meter",
            "Estimated concentration of particulate matter less than 10 microns in diameter (µg/m³), calculated by the PM2.5 sensor",
        ),
        value: |d| d.pm10_est as f64,
    },
];

/// Refresh statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Refreshes that applied a new reading.
    pub refreshes_succeeded: u64,
    /// Refreshes that left the gauges untouched.
    pub refreshes_failed: u64,
}

/// Owns the gauge set for one sensor location.
pub struct AirQualityCollector {
    registry: Registry,
    labels: LocationLabels,
    readings: Vec<GaugeFamily>,
    reading_timestamp: GaugeFamily,
    last_success: GaugeFamily,
    refresh_success: Family<LocationLabels, Counter>,
    refresh_failures: Family<FailureLabels, Counter>,
    has_reading: AtomicBool,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<AirQualityCollector>;

impl AirQualityCollector {
    /// Create the gauge set and register it.
    pub fn new(location: impl Into<String>) -> Self {
        let mut registry = Registry::default();

        let readings = READING_GAUGES
            .iter()
            .map(|gauge| {
                let family = GaugeFamily::default();
                registry.register(
                    gauge.descriptor.name,
                    gauge.descriptor.help,
                    family.clone(),
                );
                family
            })
            .collect();

        let reading_timestamp = GaugeFamily::default();
        registry.register(
            "awair_reading_timestamp_seconds",
            "Timestamp reported by the sensor for the latest applied reading",
            reading_timestamp.clone(),
        );

        let last_success = GaugeFamily::default();
        registry.register(
            "awair_last_success_timestamp_seconds",
            "Unix time of the last successful fetch from the sensor",
            last_success.clone(),
        );

        let refresh_success = Family::<LocationLabels, Counter>::default();
        registry.register(
            "awair_refresh_success",
            "Number of successful sensor fetches",
            refresh_success.clone(),
        );

        let refresh_failures = Family::<FailureLabels, Counter>::default();
        registry.register(
            "awair_refresh_failures",
            "Number of failed sensor fetches by reason",
            refresh_failures.clone(),
        );

        Self {
            registry,
            labels: LocationLabels {
                location: location.into(),
            },
            readings,
            reading_timestamp,
            last_success,
            refresh_success,
            refresh_failures,
            has_reading: AtomicBool::new(false),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// The location label value.
    pub fn location(&self) -> &str {
        &self.labels.location
    }

    /// Static metadata for every reading gauge.
    pub fn describe(&self) -> Vec<MetricDescriptor> {
        READING_GAUGES.iter().map(|g| g.descriptor).collect()
    }

    /// Set every reading gauge from `data`.
    pub fn apply(&self, data: &AirData) {
        for (gauge, family) in READING_GAUGES.iter().zip(&self.readings) {
            family.get_or_create(&self.labels).set((gauge.value)(data));
        }
        self.reading_timestamp
            .get_or_create(&self.labels)
            .set(data.timestamp_seconds());
        self.has_reading.store(true, Ordering::Release);
    }

    /// Fetch once and apply the reading on success.
    ///
    /// A failed fetch is logged and counted; no reading gauge changes.
    pub async fn refresh(&self, client: &AwairClient) -> Result<(), FetchError> {
        match client.fetch_latest().await {
            Ok(data) => {
                self.apply(&data);

                let now = Utc::now().timestamp_millis() as f64 / 1000.0;
                self.last_success.get_or_create(&self.labels).set(now);
                self.refresh_success.get_or_create(&self.labels).inc();
                self.succeeded.fetch_add(1, Ordering::Relaxed);

                debug!(
                    location = %self.labels.location,
                    score = data.score,
                    timestamp = %data.timestamp,
                    "Applied air data"
                );
                Ok(())
            }
            Err(e) => {
                self.refresh_failures
                    .get_or_create(&FailureLabels {
                        location: self.labels.location.clone(),
                        reason: e.reason().to_string(),
                    })
                    .inc();
                self.failed.fetch_add(1, Ordering::Relaxed);

                warn!(
                    url = %client.url(),
                    reason = e.reason(),
                    error = %e,
                    "Error fetching data from sensor"
                );
                Err(e)
            }
        }
    }

    /// Whether at least one reading has been applied.
    pub fn has_reading(&self) -> bool {
        self.has_reading.load(Ordering::Acquire)
    }

    /// Get refresh statistics.
    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            refreshes_succeeded: self.succeeded.load(Ordering::Relaxed),
            refreshes_failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Render all metrics in OpenMetrics text format.
    pub fn render(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
