//! EV fleet telemetry analytics service.
//!
//! Fetches per-vehicle history from a telematics API, runs the sample
//! aggregation pipeline (normalize, distance, drive mode, trips, daily and
//! aggregate statistics) and serves the result as JSON.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
