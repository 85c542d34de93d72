// HTTP request handlers
use crate::application::error::ServiceError;
use crate::domain::report::DateRange;
use crate::domain::telemetry::RawSeries;
use crate::domain::vehicle::Vehicle;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub retryable: bool,
}

impl ErrorBody {
    fn from_service_error(err: &ServiceError) -> (StatusCode, Self) {
        let (status, retryable) = match err {
            ServiceError::UnknownVehicle(_) => (StatusCode::NOT_FOUND, false),
            ServiceError::InvalidDateRange(_) => (StatusCode::BAD_REQUEST, false),
            ServiceError::Fetch(e) => (StatusCode::BAD_GATEWAY, e.is_retryable()),
            ServiceError::Directory(_) => (StatusCode::SERVICE_UNAVAILABLE, true),
        };
        (
            status,
            Self {
                error: err.to_string(),
                retryable,
            },
        )
    }
}

async fn respond<T: Serialize>(status: StatusCode, data: &T, compress: bool) -> Response {
    match json_response(status, data, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn respond_error(err: ServiceError, compress: bool) -> Response {
    let (status, body) = ErrorBody::from_service_error(&err);
    if status.is_server_error() {
        tracing::warn!("Request failed: {}", err);
    }
    respond(status, &body, compress).await
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all known vehicles
pub async fn list_vehicles(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);

    match state.vehicle_service.list_vehicles().await {
        Ok(vehicles) => respond(StatusCode::OK, &vehicles, compress).await,
        Err(e) => {
            tracing::error!("Error fetching vehicles: {}", e);
            // Return empty list on error
            respond(StatusCode::OK, &Vec::<Vehicle>::new(), compress).await
        }
    }
}

/// Look up a single vehicle
pub async fn get_vehicle(
    Path(imei): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    match state.vehicle_service.get_vehicle(&imei).await {
        Ok(vehicle) => respond(StatusCode::OK, &vehicle, compress).await,
        Err(e) => respond_error(e, compress).await,
    }
}

/// Analytics report for one vehicle over `startDate..=endDate`
pub async fn vehicle_analytics(
    Path(imei): Path<String>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let today = chrono::Local::now().date_naive();

    let range = match DateRange::parse(query.start_date.as_deref(), query.end_date.as_deref(), today) {
        Ok(range) => range,
        Err(e) => return respond_error(e.into(), compress).await,
    };

    match state.analytics_service.vehicle_report(&imei, range).await {
        Ok(report) => respond(StatusCode::OK, &report, compress).await,
        Err(e) => respond_error(e, compress).await,
    }
}

/// Run the pipeline over rows supplied in the request body
pub async fn compute_analytics(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(series): Json<RawSeries>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let output = state.analytics_service.compute(std::slice::from_ref(&series));
    respond(StatusCode::OK, &output, compress).await
}
