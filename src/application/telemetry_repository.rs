// Repository traits for telemetry history and vehicle metadata
use crate::domain::report::DateRange;
use crate::domain::telemetry::RawSeries;
use crate::domain::vehicle::Vehicle;
use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to the upstream telematics API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("telematics request failed: {0}")]
    Transport(String),

    #[error("telematics API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode telematics response: {0}")]
    Decode(String),

    #[error("telematics API reported an error: {0}")]
    Upstream(String),
}

impl FetchError {
    /// Transport problems, throttling and 5xx responses are worth retrying;
    /// the caller owns any retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Decode(_) | FetchError::Upstream(_) => false,
        }
    }
}

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Fetch the raw history series for one device over an inclusive date range
    async fn fetch_history(&self, imei: &str, range: &DateRange) -> Result<Vec<RawSeries>, FetchError>;
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// List every vehicle the directory knows
    async fn list_vehicles(&self) -> anyhow::Result<Vec<Vehicle>>;

    /// Look up one vehicle by device IMEI
    async fn find_vehicle(&self, imei: &str) -> anyhow::Result<Option<Vehicle>>;
}
