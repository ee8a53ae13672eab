//! HTTP client for the sensor's local air-data API.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::reading::AirData;

/// Path of the latest-reading endpoint on the sensor.
pub const LATEST_PATH: &str = "/air-data/latest";

/// Errors from a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("Request to sensor failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Sensor returned HTTP {0}")]
    Status(StatusCode),
    #[error("Failed to decode sensor response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Short label used for the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Build(_) | FetchError::Transport(_) => "transport",
            FetchError::Status(_) => "status",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// Client for one sensor.
#[derive(Debug, Clone)]
pub struct AwairClient {
    http: reqwest::Client,
    url: String,
}

impl AwairClient {
    /// Create a client for `host` (`host` or `host:port`).
    ///
    /// The host is substituted into the URL as-is; a malformed host shows up
    /// as a transport error on every fetch.
    pub fn new(host: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Build)?;

        Ok(Self {
            http,
            url: format!("http://{}{}", host, LATEST_PATH),
        })
    }

    /// The full URL of the latest-reading endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and decode the latest reading. One attempt, no retry.
    pub async fn fetch_latest(&self) -> Result<AirData, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;
        let data: AirData = serde_json::from_slice(&body)?;

        debug!(
            url = %self.url,
            body = %String::from_utf8_lossy(&body),
            "Fetched air data"
        );

        Ok(data)
    }
}
