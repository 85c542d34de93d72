// Domain layer - telemetry model and the aggregation pipeline
pub mod drive_mode;
pub mod error;
pub mod geo;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod sample;
pub mod summary;
pub mod telemetry;
pub mod trip;
pub mod vehicle;
