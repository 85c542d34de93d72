// Trip segmentation over a sample stream
use super::geo::segment_km;
use super::sample::NormalizedSample;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

pub const DEFAULT_MOVING_THRESHOLD_KMH: f64 = 5.0;

/// A contiguous run of moving samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub start_index: usize,
    pub end_index: usize,
    pub sample_count: usize,
    pub distance_km: f64,
    pub max_speed_kmh: f64,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Stopped,
    Moving,
}

#[derive(Debug)]
struct OpenTrip {
    start_time: DateTime<FixedOffset>,
    start_index: usize,
    last_time: DateTime<FixedOffset>,
    last_index: usize,
    sample_count: usize,
    distance_km: f64,
    max_speed_kmh: f64,
}

impl OpenTrip {
    fn close(self) -> Trip {
        Trip {
            start_time: self.start_time,
            end_time: self.last_time,
            start_index: self.start_index,
            end_index: self.last_index,
            sample_count: self.sample_count,
            distance_km: self.distance_km,
            max_speed_kmh: self.max_speed_kmh,
            duration_secs: (self.last_time - self.start_time).num_seconds(),
        }
    }
}

/// Stopped/Moving state machine. Feed samples in stream order with
/// [`push`](TripSegmenter::push), then call [`finish`](TripSegmenter::finish).
#[derive(Debug)]
pub struct TripSegmenter {
    threshold_kmh: f64,
    current: Option<OpenTrip>,
    trips: Vec<Trip>,
}

impl TripSegmenter {
    pub fn new(threshold_kmh: f64) -> Self {
        Self {
            threshold_kmh,
            current: None,
            trips: Vec::new(),
        }
    }

    pub fn state(&self) -> MotionState {
        if self.current.is_some() {
            MotionState::Moving
        } else {
            MotionState::Stopped
        }
    }

    /// Process the sample at `index`; `prev` is the sample before it in the
    /// stream, if any. Returns the state the sample was assigned to.
    pub fn push(
        &mut self,
        index: usize,
        sample: &NormalizedSample,
        prev: Option<&NormalizedSample>,
    ) -> MotionState {
        if !sample.is_moving(self.threshold_kmh) {
            if let Some(trip) = self.current.take() {
                self.trips.push(trip.close());
            }
            return MotionState::Stopped;
        }

        match self.current.as_mut() {
            Some(trip) => {
                if let Some(prev) = prev {
                    trip.distance_km += segment_km(prev, sample);
                }
                trip.last_time = sample.timestamp;
                trip.last_index = index;
                trip.sample_count += 1;
                trip.max_speed_kmh = trip.max_speed_kmh.max(sample.speed_kmh);
            }
            None => {
                self.current = Some(OpenTrip {
                    start_time: sample.timestamp,
                    start_index: index,
                    last_time: sample.timestamp,
                    last_index: index,
                    sample_count: 1,
                    distance_km: 0.0,
                    max_speed_kmh: sample.speed_kmh,
                });
            }
        }
        MotionState::Moving
    }

    /// Close any trip still open at end of stream and return all trips in
    /// stream order.
    pub fn finish(mut self) -> Vec<Trip> {
        if let Some(trip) = self.current.take() {
            self.trips.push(trip.close());
        }
        self.trips
    }
}

impl Default for TripSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MOVING_THRESHOLD_KMH)
    }
}

/// Segment a whole slice in one call.
pub fn segment_trips(samples: &[NormalizedSample], threshold_kmh: f64) -> Vec<Trip> {
    let mut segmenter = TripSegmenter::new(threshold_kmh);
    let mut prev = None;
    for (i, sample) in samples.iter().enumerate() {
        segmenter.push(i, sample, prev);
        prev = Some(sample);
    }
    segmenter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drive_mode::classify_speed_band;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(minute: i64, speed: f64, ignition: bool, lat: f64, lon: f64) -> NormalizedSample {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap().fixed_offset();
        NormalizedSample {
            timestamp: base + Duration::minutes(minute),
            lat,
            lon,
            speed_kmh: speed,
            ignition_on: ignition,
            odometer_km: None,
            throttle_pct: None,
            brake_pct: None,
            trip_status: None,
            drive_mode: classify_speed_band(speed),
        }
    }

    #[test]
    fn test_single_trip_in_the_middle() {
        let speeds = [0.0, 0.0, 30.0, 45.0, 90.0, 0.0];
        let ignition = [false, true, true, true, true, false];
        let samples: Vec<_> = (0..6)
            .map(|i| sample(i as i64, speeds[i], ignition[i], 12.97 + i as f64 * 0.001, 77.59))
            .collect();

        let trips = segment_trips(&samples, DEFAULT_MOVING_THRESHOLD_KMH);
        assert_eq!(trips.len(), 1);
        let trip = &trips[0];
        assert_eq!((trip.start_index, trip.end_index), (2, 4));
        assert_eq!(trip.sample_count, 3);
        assert_eq!(trip.max_speed_kmh, 90.0);
        assert_eq!(trip.duration_secs, 120);
        let expected = segment_km(&samples[2], &samples[3]) + segment_km(&samples[3], &samples[4]);
        assert!((trip.distance_km - expected).abs() < 1e-12);
    }

    #[test]
    fn test_trailing_trip_closed_at_end() {
        let samples = vec![
            sample(0, 0.0, true, 12.97, 77.59),
            sample(1, 20.0, true, 12.971, 77.59),
            sample(2, 25.0, true, 12.972, 77.59),
        ];
        let trips = segment_trips(&samples, 5.0);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].end_index, 2);
        assert_eq!(trips[0].end_time, samples[2].timestamp);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let samples = vec![sample(0, 5.0, true, 12.97, 77.59), sample(1, 5.0, true, 12.98, 77.59)];
        assert!(segment_trips(&samples, 5.0).is_empty());
    }

    #[test]
    fn test_ignition_off_breaks_trip() {
        let samples = vec![
            sample(0, 30.0, true, 12.97, 77.59),
            sample(1, 30.0, false, 12.971, 77.59),
            sample(2, 30.0, true, 12.972, 77.59),
            sample(3, 30.0, true, 12.973, 77.59),
        ];
        let trips = segment_trips(&samples, 5.0);
        assert_eq!(trips.len(), 2);
        assert_eq!((trips[0].start_index, trips[0].end_index), (0, 0));
        assert_eq!(trips[0].distance_km, 0.0);
        assert_eq!((trips[1].start_index, trips[1].end_index), (2, 3));
    }

    #[test]
    fn test_state_tracking() {
        let mut segmenter = TripSegmenter::default();
        let a = sample(0, 30.0, true, 12.97, 77.59);
        let b = sample(1, 0.0, true, 12.97, 77.59);
        assert_eq!(segmenter.state(), MotionState::Stopped);
        assert_eq!(segmenter.push(0, &a, None), MotionState::Moving);
        assert_eq!(segmenter.state(), MotionState::Moving);
        assert_eq!(segmenter.push(1, &b, Some(&a)), MotionState::Stopped);
        assert_eq!(segmenter.finish().len(), 1);
    }
}
