// Vehicle service - Use case for listing and looking up vehicles
use crate::application::error::ServiceError;
use crate::application::telemetry_repository::VehicleRepository;
use crate::domain::vehicle::Vehicle;
use std::sync::Arc;

#[derive(Clone)]
pub struct VehicleService {
    repository: Arc<dyn VehicleRepository>,
}

impl VehicleService {
    pub fn new(repository: Arc<dyn VehicleRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_vehicles(&self) -> anyhow::Result<Vec<Vehicle>> {
        let mut vehicles = self.repository.list_vehicles().await?;
        vehicles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.imei.cmp(&b.imei)));
        Ok(vehicles)
    }

    pub async fn get_vehicle(&self, imei: &str) -> Result<Vehicle, ServiceError> {
        self.repository
            .find_vehicle(imei)
            .await?
            .ok_or_else(|| ServiceError::UnknownVehicle(imei.to_string()))
    }
}
