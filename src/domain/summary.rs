// Daily and aggregate statistics over a classified, segmented stream
use super::drive_mode::DriveMode;
use super::sample::NormalizedSample;
use super::trip::{MotionState, Trip};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which clock decides the calendar day of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DayBoundary {
    /// The offset embedded in each source timestamp.
    #[default]
    Source,
    Utc,
    Fixed(FixedOffset),
}

impl DayBoundary {
    pub fn day_of(&self, ts: &DateTime<FixedOffset>) -> NaiveDate {
        match self {
            DayBoundary::Source => ts.date_naive(),
            DayBoundary::Utc => ts.naive_utc().date(),
            DayBoundary::Fixed(offset) => ts.with_timezone(offset).date_naive(),
        }
    }
}

impl FromStr for DayBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" | "" => Ok(DayBoundary::Source),
            "utc" | "z" => Ok(DayBoundary::Utc),
            other => parse_offset(other)
                .map(DayBoundary::Fixed)
                .ok_or_else(|| format!("invalid day boundary '{}': expected source, utc or +HH:MM", s)),
        }
    }
}

impl TryFrom<String> for DayBoundary {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayBoundary> for String {
    fn from(value: DayBoundary) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DayBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayBoundary::Source => f.write_str("source"),
            DayBoundary::Utc => f.write_str("utc"),
            DayBoundary::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    if !s.is_ascii() {
        return None;
    }
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None if rest.len() == 4 => (rest[..2].parse().ok()?, rest[2..].parse().ok()?),
        None => (rest.parse().ok()?, 0),
    };
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Round to one decimal place for display.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub distance_km: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub sample_count: usize,
}

/// Share of samples per drive mode, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveModeBreakdown {
    pub idle: f64,
    pub eco: f64,
    pub family: f64,
    pub power: f64,
}

impl DriveModeBreakdown {
    pub fn from_counts(counts: &[usize; 4], total: usize) -> Self {
        if total == 0 {
            return Self::default();
        }
        let pct = |mode: DriveMode| counts[mode.index()] as f64 / total as f64 * 100.0;
        Self {
            idle: pct(DriveMode::Idle),
            eco: pct(DriveMode::Eco),
            family: pct(DriveMode::Family),
            power: pct(DriveMode::Power),
        }
    }

    pub fn get(&self, mode: DriveMode) -> f64 {
        match mode {
            DriveMode::Idle => self.idle,
            DriveMode::Eco => self.eco,
            DriveMode::Family => self.family,
            DriveMode::Power => self.power,
        }
    }

    pub fn total(&self) -> f64 {
        DriveMode::ALL.iter().map(|mode| self.get(*mode)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub total_samples: usize,
    pub moving_sample_count: usize,
    pub stopped_sample_count: usize,
    pub total_distance_km: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub drive_modes: DriveModeBreakdown,
    pub trip_count: usize,
    pub longest_trip_km: f64,
    pub avg_trip_distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer_distance_km: Option<f64>,
    pub day_count: usize,
}

#[derive(Debug, Default)]
struct DayAccumulator {
    distance_km: f64,
    max_speed_kmh: f64,
    sum_speed_kmh: f64,
    sample_count: usize,
}

/// Folds samples one at a time; accumulation stays at full precision and
/// only the finished outputs are rounded.
#[derive(Debug, Default)]
pub struct StatisticsBuilder {
    day_boundary: DayBoundary,
    days: BTreeMap<NaiveDate, DayAccumulator>,
    total_distance_km: f64,
    sum_speed_kmh: f64,
    max_speed_kmh: f64,
    mode_counts: [usize; 4],
    moving: usize,
    stopped: usize,
    first_odometer_km: Option<f64>,
    last_odometer_km: Option<f64>,
}

impl StatisticsBuilder {
    pub fn new(day_boundary: DayBoundary) -> Self {
        Self {
            day_boundary,
            ..Self::default()
        }
    }

    /// Add one sample together with the distance from its predecessor and the
    /// motion state the segmenter gave it.
    pub fn push(&mut self, sample: &NormalizedSample, segment_km: f64, state: MotionState) {
        let day = self.days.entry(self.day_boundary.day_of(&sample.timestamp)).or_default();
        day.distance_km += segment_km;
        day.max_speed_kmh = day.max_speed_kmh.max(sample.speed_kmh);
        day.sum_speed_kmh += sample.speed_kmh;
        day.sample_count += 1;

        self.total_distance_km += segment_km;
        self.sum_speed_kmh += sample.speed_kmh;
        self.max_speed_kmh = self.max_speed_kmh.max(sample.speed_kmh);
        self.mode_counts[sample.drive_mode.index()] += 1;

        match state {
            MotionState::Moving => self.moving += 1,
            MotionState::Stopped => self.stopped += 1,
        }

        // A zero reading is an unparsable or absent cell, not a real odometer
        if let Some(odo) = sample.odometer_km.filter(|km| *km > 0.0) {
            self.first_odometer_km.get_or_insert(odo);
            self.last_odometer_km = Some(odo);
        }
    }

    pub fn finish(self, trips: &[Trip]) -> (Vec<DailyBucket>, AggregateSummary) {
        let total = self.moving + self.stopped;

        let daily = self
            .days
            .into_iter()
            .map(|(date, acc)| DailyBucket {
                date,
                distance_km: round1(acc.distance_km),
                max_speed_kmh: round1(acc.max_speed_kmh),
                avg_speed_kmh: round1(mean(acc.sum_speed_kmh, acc.sample_count)),
                sample_count: acc.sample_count,
            })
            .collect::<Vec<_>>();

        let trip_total_km: f64 = trips.iter().map(|t| t.distance_km).sum();
        let longest_trip_km = trips.iter().map(|t| t.distance_km).fold(0.0, f64::max);

        let odometer_distance_km = match (self.first_odometer_km, self.last_odometer_km) {
            (Some(first), Some(last)) => Some(round1((last - first).max(0.0))),
            _ => None,
        };

        let summary = AggregateSummary {
            total_samples: total,
            moving_sample_count: self.moving,
            stopped_sample_count: self.stopped,
            total_distance_km: round1(self.total_distance_km),
            avg_speed_kmh: round1(mean(self.sum_speed_kmh, total)),
            max_speed_kmh: round1(self.max_speed_kmh),
            drive_modes: DriveModeBreakdown::from_counts(&self.mode_counts, total),
            trip_count: trips.len(),
            longest_trip_km: round1(longest_trip_km),
            avg_trip_distance_km: round1(mean(trip_total_km, trips.len())),
            odometer_distance_km,
            day_count: daily.len(),
        };

        (daily, summary)
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}
