// Row-level errors raised while normalizing raw telemetry rows
use serde::Serialize;
use thiserror::Error;

/// Why a raw row was dropped from a batch.
///
/// These never abort an aggregation: the pipeline skips the row and counts it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("row has {actual} values but {expected} columns")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("row has no timestamp column")]
    MissingTimestamp,

    #[error("unparsable timestamp: {0}")]
    InvalidTimestamp(String),
}

impl RowError {
    pub fn kind(&self) -> RowErrorKind {
        match self {
            RowError::LengthMismatch { .. } => RowErrorKind::LengthMismatch,
            RowError::MissingTimestamp => RowErrorKind::MissingTimestamp,
            RowError::InvalidTimestamp(_) => RowErrorKind::InvalidTimestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RowErrorKind {
    LengthMismatch,
    MissingTimestamp,
    InvalidTimestamp,
}

/// Problems with a requested `startDate`/`endDate` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("invalid {field} '{value}': expected DD-MM-YYYY")]
    InvalidDate { field: &'static str, value: String },

    #[error("endDate {end} is before startDate {start}")]
    EndBeforeStart { start: String, end: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = RowError::LengthMismatch { expected: 5, actual: 3 };
        assert_eq!(err.kind(), RowErrorKind::LengthMismatch);
        assert_eq!(err.to_string(), "row has 3 values but 5 columns");

        let err = RowError::InvalidTimestamp("yesterday".to_string());
        assert_eq!(err.kind(), RowErrorKind::InvalidTimestamp);
    }
}
