//! Air quality reading returned by the sensor's local API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// A single snapshot of sensor state from `/air-data/latest`.
///
/// Values are kept exactly as the sensor reports them; no range checks
/// or unit conversion happen here. A missing or `null` key decodes to zero
/// (the Unix epoch for `timestamp`); only a value of the wrong type is an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AirData {
    /// Time of the reading.
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: DateTime<Utc>,
    /// Awair score (0-100).
    #[serde(deserialize_with = "null_as_default")]
    pub score: i64,
    /// Dew point in degrees Celsius.
    #[serde(deserialize_with = "null_as_default")]
    pub dew_point: f64,
    /// Temperature in degrees Celsius.
    #[serde(deserialize_with = "null_as_default")]
    pub temp: f64,
    /// Relative humidity percentage.
    #[serde(deserialize_with = "null_as_default")]
    pub humid: f64,
    /// Absolute humidity in g/m³.
    #[serde(deserialize_with = "null_as_default")]
    pub abs_humid: f64,
    /// Measured CO2 in ppm.
    #[serde(deserialize_with = "null_as_default")]
    pub co2: i64,
    /// CO2 estimated by the TVOC sensor, in ppm.
    #[serde(deserialize_with = "null_as_default")]
    pub co2_est: i64,
    /// Unitless baseline for the CO2 estimate.
    #[serde(deserialize_with = "null_as_default")]
    pub co2_est_baseline: i64,
    /// Total volatile organic compounds in ppb.
    #[serde(deserialize_with = "null_as_default")]
    pub voc: i64,
    /// Unitless TVOC baseline.
    #[serde(deserialize_with = "null_as_default")]
    pub voc_baseline: i64,
    /// Unitless raw hydrogen signal.
    #[serde(deserialize_with = "null_as_default")]
    pub voc_h2_raw: i64,
    /// Unitless raw ethanol signal.
    #[serde(deserialize_with = "null_as_default")]
    pub voc_ethanol_raw: i64,
    /// PM2.5 in µg/m³.
    #[serde(deserialize_with = "null_as_default")]
    pub pm25: i64,
    /// Estimated PM10 in µg/m³.
    #[serde(deserialize_with = "null_as_default")]
    pub pm10_est: i64,
}

/// Decode `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AirData {
    /// Reading timestamp as fractional Unix seconds.
    pub fn timestamp_seconds(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "timestamp": "2024-03-01T12:30:00.000Z",
        "score": 85,
        "dew_point": 9.12,
        "temp": 21.5,
        "humid": 45.3,
        "abs_humid": 8.61,
        "co2": 450,
        "co2_est": 412,
        "co2_est_baseline": 35028,
        "voc": 112,
        "voc_baseline": 37829,
        "voc_h2_raw": 27,
        "voc_ethanol_raw": 38,
        "pm25": 3,
        "pm10_est": 4
    }"#;

    #[test]
    fn test_decode_sample() {
        let data: AirData = serde_json::from_str(SAMPLE).unwrap();

        assert_eq!(data.score, 85);
        assert_eq!(data.temp, 21.5);
        assert_eq!(data.co2, 450);
        assert_eq!(data.voc_baseline, 37829);
        assert_eq!(data.pm10_est, 4);
        assert_eq!(data.timestamp.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let json = SAMPLE.replacen('{', r#"{"firmware": "1.4.0","#, 1);
        let data: AirData = serde_json::from_str(&json).unwrap();
        assert_eq!(data.score, 85);
    }

    #[test]
    fn test_decode_type_mismatch() {
        let json = SAMPLE.replace(r#""co2": 450"#, r#""co2": "high""#);
        assert!(serde_json::from_str::<AirData>(&json).is_err());
    }

    #[test]
    fn test_decode_missing_field_as_zero() {
        let json = SAMPLE.replace(r#""pm25": 3,"#, "");
        let data: AirData = serde_json::from_str(&json).unwrap();

        assert_eq!(data.pm25, 0);
        assert_eq!(data.pm10_est, 4);
        assert_eq!(data.score, 85);
    }

    #[test]
    fn test_decode_null_as_zero() {
        let json = SAMPLE
            .replace(r#""co2": 450"#, r#""co2": null"#)
            .replace(r#""temp": 21.5"#, r#""temp": null"#);
        let data: AirData = serde_json::from_str(&json).unwrap();

        assert_eq!(data.co2, 0);
        assert_eq!(data.temp, 0.0);
        assert_eq!(data.co2_est, 412);
    }

    #[test]
    fn test_decode_missing_timestamp_as_epoch() {
        let json = SAMPLE.replace(r#""timestamp": "2024-03-01T12:30:00.000Z","#, "");
        let data: AirData = serde_json::from_str(&json).unwrap();

        assert_eq!(data.timestamp_seconds(), 0.0);
        assert_eq!(data.score, 85);
    }

    #[test]
    fn test_timestamp_seconds() {
        let data: AirData = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(data.timestamp_seconds(), 1_709_296_200.0);
    }
}
