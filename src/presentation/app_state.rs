// Application state for HTTP handlers
use crate::application::analytics_service::AnalyticsService;
use crate::application::vehicle_service::VehicleService;

#[derive(Clone)]
pub struct AppState {
    pub analytics_service: AnalyticsService,
    pub vehicle_service: VehicleService,
}
