//! Telemetry sample aggregation pipeline.
//!
//! raw rows -> normalizer -> (distance, drive mode) -> trip segmenter ->
//! statistics builder. One call owns all intermediate state and returns a
//! self-contained [`PipelineOutput`]; nothing is carried between calls.

use super::drive_mode::DriveModeStrategy;
use super::error::RowErrorKind;
use super::geo::segment_km;
use super::normalizer::{ColumnMap, Field};
use super::sample::NormalizedSample;
use super::summary::{AggregateSummary, DailyBucket, DayBoundary, StatisticsBuilder};
use super::telemetry::RawSeries;
use super::trip::{DEFAULT_MOVING_THRESHOLD_KMH, MotionState, Trip, TripSegmenter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub moving_threshold_kmh: f64,
    pub drive_mode_strategy: DriveModeStrategy,
    pub day_boundary: DayBoundary,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            moving_threshold_kmh: DEFAULT_MOVING_THRESHOLD_KMH,
            drive_mode_strategy: DriveModeStrategy::default(),
            day_boundary: DayBoundary::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub summary: AggregateSummary,
    pub daily: Vec<DailyBucket>,
    pub trips: Vec<Trip>,
    pub samples: Vec<NormalizedSample>,
    pub skipped_rows: usize,
    pub skipped_by_reason: BTreeMap<RowErrorKind, usize>,
}

/// Normalize every row of every series, then aggregate. Malformed rows are
/// dropped and counted.
pub fn aggregate(series: &[RawSeries], config: &PipelineConfig) -> PipelineOutput {
    let mut samples = Vec::with_capacity(series.iter().map(RawSeries::row_count).sum());
    let mut skipped_by_reason = BTreeMap::new();

    for s in series {
        let columns = ColumnMap::new(s.columns.as_slice());
        if !columns.has(Field::Timestamp) && s.row_count() > 0 {
            tracing::warn!(
                "Series has no timestamp column, all {} rows will be skipped",
                s.row_count()
            );
        }
        for (row_idx, row) in s.values.iter().enumerate() {
            match columns.normalize(row, config.drive_mode_strategy) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    tracing::debug!("Skipping row {}: {}", row_idx, e);
                    *skipped_by_reason.entry(e.kind()).or_insert(0) += 1;
                }
            }
        }
    }

    let mut output = aggregate_samples(samples, config);
    output.skipped_rows = skipped_by_reason.values().sum();
    output.skipped_by_reason = skipped_by_reason;
    output
}

/// Aggregate samples that are already normalized and classified, in stream
/// order.
pub fn aggregate_samples(samples: Vec<NormalizedSample>, config: &PipelineConfig) -> PipelineOutput {
    let mut segmenter = TripSegmenter::new(config.moving_threshold_kmh);
    let mut stats = StatisticsBuilder::new(config.day_boundary);

    let mut prev: Option<&NormalizedSample> = None;
    for (i, sample) in samples.iter().enumerate() {
        // First sample has no predecessor and contributes no distance
        let segment = prev.map(|p| segment_km(p, sample)).unwrap_or(0.0);
        let state = segmenter.push(i, sample, prev);
        stats.push(sample, segment, state);
        prev = Some(sample);
    }

    if segmenter.state() == MotionState::Moving {
        tracing::debug!("Closing trip still open at end of stream");
    }
    let trips = segmenter.finish();
    let (daily, summary) = stats.finish(&trips);

    tracing::debug!(
        "Aggregated {} samples into {} trips over {} days",
        summary.total_samples,
        trips.len(),
        daily.len()
    );

    PipelineOutput {
        summary,
        daily,
        trips,
        samples,
        skipped_rows: 0,
        skipped_by_reason: BTreeMap::new(),
    }
}
