// Drive-mode classification
use serde::{Deserialize, Serialize};

pub const CITY_MAX_KMH: f64 = 40.0;
pub const MIXED_MAX_KMH: f64 = 80.0;
pub const POWER_THROTTLE_PCT: f64 = 70.0;
pub const POWER_SPEED_KMH: f64 = 60.0;

/// Operating-style bucket of a single sample.
///
/// The speed-band table maps stationary samples to `Idle`, city speeds to
/// `Eco`, mixed speeds to `Family` and highway speeds to `Power`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DriveMode {
    Idle,
    Eco,
    Family,
    Power,
}

impl DriveMode {
    pub const ALL: [DriveMode; 4] = [
        DriveMode::Idle,
        DriveMode::Eco,
        DriveMode::Family,
        DriveMode::Power,
    ];

    pub fn index(self) -> usize {
        match self {
            DriveMode::Idle => 0,
            DriveMode::Eco => 1,
            DriveMode::Family => 2,
            DriveMode::Power => 3,
        }
    }
}

/// Which threshold table assigns drive modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveModeStrategy {
    /// Four speed bands: 0, (0, 40], (40, 80], above 80 km/h.
    #[default]
    SpeedBands,
    /// `Power` when throttle > 70% or speed > 60 km/h, otherwise `Eco`.
    ThrottleSpeed,
}

impl DriveModeStrategy {
    pub fn classify(self, speed_kmh: f64, throttle_pct: Option<f64>) -> DriveMode {
        match self {
            DriveModeStrategy::SpeedBands => classify_speed_band(speed_kmh),
            DriveModeStrategy::ThrottleSpeed => classify_throttle(speed_kmh, throttle_pct),
        }
    }
}

pub fn classify_speed_band(speed_kmh: f64) -> DriveMode {
    if speed_kmh <= 0.0 {
        DriveMode::Idle
    } else if speed_kmh <= CITY_MAX_KMH {
        DriveMode::Eco
    } else if speed_kmh <= MIXED_MAX_KMH {
        DriveMode::Family
    } else {
        DriveMode::Power
    }
}

pub fn classify_throttle(speed_kmh: f64, throttle_pct: Option<f64>) -> DriveMode {
    let throttle = throttle_pct.unwrap_or(0.0);
    if throttle > POWER_THROTTLE_PCT || speed_kmh > POWER_SPEED_KMH {
        DriveMode::Power
    } else {
        DriveMode::Eco
    }
}
