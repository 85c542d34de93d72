// Sample normalizer - maps raw telemetry rows onto NormalizedSample
use super::drive_mode::DriveModeStrategy;
use super::error::RowError;
use super::sample::{NormalizedSample, parse_timestamp};
use serde_json::Value;
use std::collections::HashMap;

/// Logical fields a raw row can carry, each with the column names seen in
/// the wild. The first alias that is present and non-null wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Timestamp,
    Latitude,
    Longitude,
    Speed,
    Ignition,
    Odometer,
    TripStatus,
    Throttle,
    Brake,
}

impl Field {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Timestamp => &["time", "timestamp", "ts", "datetime"],
            Field::Latitude => &["lat", "latitude", "gps_lat"],
            Field::Longitude => &["lon", "lng", "long", "longitude", "gps_lon", "gps_lng"],
            Field::Speed => &["speed", "spd", "vehicle_speed", "gps_speed"],
            Field::Ignition => &["ignition", "ign", "ignition_status", "key_on"],
            Field::Odometer => &["odometer", "odo", "odometer_km"],
            Field::TripStatus => &["trip_status", "tripstatus", "trip_state"],
            Field::Throttle => &["throttle", "throt", "motor_throt"],
            Field::Brake => &["brake", "brk"],
        }
    }
}

/// Column name to index lookup for one series, case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    width: usize,
    index: HashMap<String, usize>,
}

impl ColumnMap {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            // Keep the first occurrence of a duplicated column name
            index.entry(name.as_ref().trim().to_ascii_lowercase()).or_insert(i);
        }
        Self {
            width: columns.len(),
            index,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn has(&self, field: Field) -> bool {
        field.aliases().iter().any(|a| self.index.contains_key(*a))
    }

    /// First present, non-null cell among the field's aliases.
    pub fn lookup<'a>(&self, row: &'a [Value], field: Field) -> Option<&'a Value> {
        field
            .aliases()
            .iter()
            .filter_map(|alias| self.index.get(*alias))
            .filter_map(|&i| row.get(i))
            .find(|v| !v.is_null())
    }

    /// Build a sample from one row. Only structural problems (wrong width,
    /// missing or bad timestamp) are errors; every other field defaults.
    pub fn normalize(
        &self,
        row: &[Value],
        strategy: DriveModeStrategy,
    ) -> Result<NormalizedSample, RowError> {
        if row.len() != self.width {
            return Err(RowError::LengthMismatch {
                expected: self.width,
                actual: row.len(),
            });
        }

        let timestamp = self
            .lookup(row, Field::Timestamp)
            .ok_or(RowError::MissingTimestamp)
            .and_then(parse_timestamp)?;

        let speed_kmh = self
            .lookup(row, Field::Speed)
            .map(number_or_zero)
            .unwrap_or(0.0)
            .max(0.0);
        let throttle_pct = self.lookup(row, Field::Throttle).map(number_or_zero);

        Ok(NormalizedSample {
            timestamp,
            lat: self.lookup(row, Field::Latitude).map(number_or_zero).unwrap_or(0.0),
            lon: self.lookup(row, Field::Longitude).map(number_or_zero).unwrap_or(0.0),
            speed_kmh,
            ignition_on: self.lookup(row, Field::Ignition).map(flag).unwrap_or(false),
            odometer_km: self
                .lookup(row, Field::Odometer)
                .map(number_or_zero)
                .map(|km| km.max(0.0)),
            throttle_pct,
            brake_pct: self.lookup(row, Field::Brake).map(number_or_zero),
            trip_status: self.lookup(row, Field::TripStatus).map(text),
            drive_mode: strategy.classify(speed_kmh, throttle_pct),
        })
    }
}

/// Numeric cell, or 0 when it cannot be read as a finite number.
pub fn number_or_zero(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes" | "y"
        ),
        _ => false,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drive_mode::DriveMode;
    use serde_json::json;

    fn columns() -> ColumnMap {
        ColumnMap::new(&["time", "Latitude", "lng", "spd", "ign", "odo", "motor_throt", "brk"])
    }

    #[test]
    fn test_aliases_resolve_case_insensitively() {
        let map = columns();
        let row = vec![
            json!("2024-03-01T10:00:00Z"),
            json!(12.9716),
            json!("77.5946"),
            json!(45),
            json!(1),
            json!(1520.5),
            json!(35),
            json!(0),
        ];
        let sample = map.normalize(&row, DriveModeStrategy::SpeedBands).unwrap();
        assert_eq!(sample.lat, 12.9716);
        assert_eq!(sample.lon, 77.5946);
        assert_eq!(sample.speed_kmh, 45.0);
        assert!(sample.ignition_on);
        assert_eq!(sample.odometer_km, Some(1520.5));
        assert_eq!(sample.throttle_pct, Some(35.0));
        assert_eq!(sample.brake_pct, Some(0.0));
        assert_eq!(sample.drive_mode, DriveMode::Family);
    }

    #[test]
    fn test_first_non_null_alias_wins() {
        let map = ColumnMap::new(&["time", "throttle", "throt"]);
        let row = vec![json!("2024-03-01T10:00:00Z"), Value::Null, json!(80)];
        let sample = map.normalize(&row, DriveModeStrategy::ThrottleSpeed).unwrap();
        assert_eq!(sample.throttle_pct, Some(80.0));
        assert_eq!(sample.drive_mode, DriveMode::Power);
    }

    #[test]
    fn test_missing_fields_default() {
        let map = ColumnMap::new(&["time"]);
        let sample = map
            .normalize(&[json!("2024-03-01T10:00:00Z")], DriveModeStrategy::SpeedBands)
            .unwrap();
        assert_eq!(sample.speed_kmh, 0.0);
        assert_eq!((sample.lat, sample.lon), (0.0, 0.0));
        assert!(!sample.ignition_on);
        assert_eq!(sample.odometer_km, None);
        assert_eq!(sample.throttle_pct, None);
        assert_eq!(sample.drive_mode, DriveMode::Idle);
    }

    #[test]
    fn test_unparsable_numbers_become_zero() {
        let map = ColumnMap::new(&["time", "speed", "lat", "lon", "throttle"]);
        let row = vec![
            json!("2024-03-01T10:00:00Z"),
            json!("fast"),
            json!("n/a"),
            json!({}),
            json!("??"),
        ];
        let sample = map.normalize(&row, DriveModeStrategy::SpeedBands).unwrap();
        assert_eq!(sample.speed_kmh, 0.0);
        assert_eq!(sample.lat, 0.0);
        assert_eq!(sample.lon, 0.0);
        assert_eq!(sample.throttle_pct, Some(0.0));
    }

    #[test]
    fn test_negative_speed_clamped() {
        let map = ColumnMap::new(&["time", "speed"]);
        let row = vec![json!("2024-03-01T10:00:00Z"), json!(-3.5)];
        let sample = map.normalize(&row, DriveModeStrategy::SpeedBands).unwrap();
        assert_eq!(sample.speed_kmh, 0.0);
    }

    #[test]
    fn test_ignition_spellings() {
        for (raw, expected) in [
            (json!(true), true),
            (json!("ON"), true),
            (json!("1"), true),
            (json!(0), false),
            (json!("off"), false),
            (json!("garbage"), false),
        ] {
            assert_eq!(flag(&raw), expected, "{raw}");
        }
    }

    #[test]
    fn test_malformed_rows() {
        let map = columns();
        assert_eq!(
            map.normalize(&[json!("2024-03-01T10:00:00Z")], DriveModeStrategy::SpeedBands),
            Err(RowError::LengthMismatch { expected: 8, actual: 1 })
        );

        let map = ColumnMap::new(&["speed"]);
        assert_eq!(
            map.normalize(&[json!(10)], DriveModeStrategy::SpeedBands),
            Err(RowError::MissingTimestamp)
        );

        let map = ColumnMap::new(&["time"]);
        assert!(matches!(
            map.normalize(&[json!("31-31-2024")], DriveModeStrategy::SpeedBands),
            Err(RowError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_trip_status_passthrough() {
        let map = ColumnMap::new(&["time", "trip_status"]);
        let sample = map
            .normalize(&[json!("2024-03-01T10:00:00Z"), json!(2)], DriveModeStrategy::SpeedBands)
            .unwrap();
        assert_eq!(sample.trip_status.as_deref(), Some("2"));
        assert!(map.has(Field::TripStatus));
        assert!(!map.has(Field::Odometer));
    }
}
