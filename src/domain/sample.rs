// Canonical telemetry sample
use super::drive_mode::DriveMode;
use super::error::RowError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d-%m-%Y %H:%M:%S",
];

/// One telemetry row after alias resolution and defaulting.
///
/// `lat`/`lon` are 0 when the source had nothing usable; use [`position`]
/// rather than reading them directly when a real fix matters.
///
/// [`position`]: NormalizedSample::position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSample {
    pub timestamp: DateTime<FixedOffset>,
    pub lat: f64,
    pub lon: f64,
    pub speed_kmh: f64,
    pub ignition_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brake_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_status: Option<String>,
    pub drive_mode: DriveMode,
}

impl NormalizedSample {
    /// Coordinates, or `None` when either axis is the 0 placeholder.
    pub fn position(&self) -> Option<(f64, f64)> {
        if self.lat == 0.0 || self.lon == 0.0 {
            None
        } else {
            Some((self.lat, self.lon))
        }
    }

    pub fn is_moving(&self, threshold_kmh: f64) -> bool {
        self.ignition_on && self.speed_kmh > threshold_kmh
    }

    pub fn time_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Parse a source timestamp cell.
///
/// Strings may be RFC 3339 (offset kept), naive date-times (taken as UTC) or
/// bare epoch digits. Numbers are epoch values whose unit is inferred from
/// magnitude.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<FixedOffset>, RowError> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_epoch)
            .ok_or_else(|| RowError::InvalidTimestamp(n.to_string())),
        Value::Null => Err(RowError::MissingTimestamp),
        other => Err(RowError::InvalidTimestamp(other.to_string())),
    }
}

fn parse_timestamp_str(s: &str) -> Result<DateTime<FixedOffset>, RowError> {
    if s.is_empty() {
        return Err(RowError::MissingTimestamp);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts);
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(ts) = s.parse::<i64>().ok().and_then(from_epoch) {
            return Ok(ts);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    Err(RowError::InvalidTimestamp(s.to_string()))
}

fn from_epoch(raw: i64) -> Option<DateTime<FixedOffset>> {
    let magnitude = raw.unsigned_abs();
    let ts = if magnitude >= 100_000_000_000_000_000 {
        Some(DateTime::from_timestamp_nanos(raw))
    } else if magnitude >= 100_000_000_000_000 {
        DateTime::from_timestamp_micros(raw)
    } else if magnitude >= 100_000_000_000 {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    };
    ts.map(|t| t.fixed_offset())
}
