// Telemetry data domain models
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `series` block of a history response: column names plus rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl RawSeries {
    pub fn new(columns: Vec<String>, values: Vec<Vec<Value>>) -> Self {
        Self { columns, values }
    }

    pub fn row_count(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// Downsample time series points using bucket averaging
pub fn downsample_points(points: Vec<TimeSeriesPoint>, max_points: usize) -> Vec<TimeSeriesPoint> {
    if max_points == 0 || points.len() <= max_points {
        return points;
    }

    let bucket_size = points.len().div_ceil(max_points);
    points
        .chunks(bucket_size)
        .map(|chunk| {
            // Middle point's timestamp, average value
            let mid = &chunk[chunk.len() / 2];
            let avg = chunk.iter().map(|p| p.value).sum::<f64>() / chunk.len() as f64;
            TimeSeriesPoint::new(mid.time_ms, avg)
        })
        .collect()
}
