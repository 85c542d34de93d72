// Application layer - use cases over the repositories
pub mod analytics_service;
pub mod error;
pub mod telemetry_repository;
pub mod vehicle_service;
