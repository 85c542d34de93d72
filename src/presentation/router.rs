// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    compute_analytics, get_vehicle, health_check, list_vehicles, vehicle_analytics,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Compression is handled in the response builders, so no CompressionLayer here
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/:imei", get(get_vehicle))
        .route("/vehicles/:imei/analytics", get(vehicle_analytics))
        .route("/analytics", post(compute_analytics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
