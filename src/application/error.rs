// Errors surfaced by application services
use crate::application::telemetry_repository::FetchError;
use crate::domain::error::DateRangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown vehicle {0}")]
    UnknownVehicle(String),

    #[error(transparent)]
    InvalidDateRange(#[from] DateRangeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("vehicle directory unavailable: {0}")]
    Directory(String),
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Directory(format!("{:#}", err))
    }
}
