// Vehicle analytics report handed to the presentation layer
use super::error::{DateRangeError, RowErrorKind};
use super::pipeline::PipelineOutput;
use super::sample::NormalizedSample;
use super::summary::{AggregateSummary, DailyBucket};
use super::telemetry::{TimeSeriesPoint, downsample_points};
use super::trip::Trip;
use super::vehicle::Vehicle;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Inclusive calendar range of a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end < start {
            return Err(DateRangeError::EndBeforeStart {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse `DD-MM-YYYY` bounds; a missing bound falls back to `today`.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, DateRangeError> {
        let start = parse_bound("startDate", start)?.unwrap_or(today);
        let end = parse_bound("endDate", end)?.unwrap_or(today.max(start));
        Self::new(start, end)
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

fn parse_bound(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, DateRangeError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| DateRangeError::InvalidDate {
                field,
                value: s.to_string(),
            }),
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("DateRange", 2)?;
        s.serialize_field("startDate", &self.start_param())?;
        s.serialize_field("endDate", &self.end_param())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReport {
    pub vehicle: Vehicle,
    pub range: DateRange,
    pub summary: AggregateSummary,
    pub daily: Vec<DailyBucket>,
    pub trips: Vec<Trip>,
    pub samples: Vec<NormalizedSample>,
    pub speed_series: Vec<TimeSeriesPoint>,
    pub skipped_rows: usize,
    pub skipped_by_reason: BTreeMap<RowErrorKind, usize>,
}

impl VehicleReport {
    pub fn new(
        vehicle: Vehicle,
        range: DateRange,
        output: PipelineOutput,
        max_chart_points: usize,
    ) -> Self {
        let speed_points = output
            .samples
            .iter()
            .map(|s| TimeSeriesPoint::new(s.time_ms(), s.speed_kmh))
            .collect();

        Self {
            vehicle,
            range,
            summary: output.summary,
            daily: output.daily,
            trips: output.trips,
            samples: output.samples,
            speed_series: downsample_points(speed_points, max_chart_points),
            skipped_rows: output.skipped_rows,
            skipped_by_reason: output.skipped_by_reason,
        }
    }
}
