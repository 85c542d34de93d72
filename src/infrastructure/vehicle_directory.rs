// Static vehicle directory loaded from configuration
use crate::application::telemetry_repository::VehicleRepository;
use crate::domain::vehicle::Vehicle;
use crate::infrastructure::config::VehicleEntry;
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct StaticVehicleDirectory {
    vehicles: HashMap<String, Vehicle>,
}

impl StaticVehicleDirectory {
    pub fn new(vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        let mut map = HashMap::new();
        for vehicle in vehicles {
            if map.contains_key(&vehicle.imei) {
                tracing::warn!("Duplicate vehicle entry for {}, keeping the last one", vehicle.imei);
            }
            map.insert(vehicle.imei.clone(), vehicle);
        }
        Self { vehicles: map }
    }

    pub fn from_entries(entries: Vec<VehicleEntry>) -> Self {
        Self::new(entries.into_iter().map(Vehicle::from))
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

#[async_trait]
impl VehicleRepository for StaticVehicleDirectory {
    async fn list_vehicles(&self) -> anyhow::Result<Vec<Vehicle>> {
        Ok(self.vehicles.values().cloned().collect())
    }

    async fn find_vehicle(&self, imei: &str) -> anyhow::Result<Option<Vehicle>> {
        Ok(self.vehicles.get(imei.trim()).cloned())
    }
}
