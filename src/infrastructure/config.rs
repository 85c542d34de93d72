use crate::domain::drive_mode::DriveModeStrategy;
use crate::domain::pipeline::PipelineConfig;
use crate::domain::summary::DayBoundary;
use crate::domain::trip::DEFAULT_MOVING_THRESHOLD_KMH;
use crate::domain::vehicle::Vehicle;
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_CONFIG_PATH: &str = "config/fleet";
pub const DEFAULT_HISTORY_PATH: &str = "/devices/${imei}/history?startDate=${start}&endDate=${end}";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub telematics: TelematicsSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
    #[serde(default)]
    pub vehicles: Vec<VehicleEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelematicsSettings {
    pub base_url: String,
    #[serde(default = "default_history_path")]
    pub history_path: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub moving_threshold_kmh: f64,
    pub drive_mode_strategy: DriveModeStrategy,
    pub day_boundary: DayBoundary,
    pub max_chart_points: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            moving_threshold_kmh: DEFAULT_MOVING_THRESHOLD_KMH,
            drive_mode_strategy: DriveModeStrategy::default(),
            day_boundary: DayBoundary::default(),
            max_chart_points: 150,
        }
    }
}

impl AnalyticsSettings {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            moving_threshold_kmh: self.moving_threshold_kmh,
            drive_mode_strategy: self.drive_mode_strategy,
            day_boundary: self.day_boundary,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VehicleEntry {
    pub imei: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub registration: Option<String>,
    pub battery_kwh: Option<f64>,
}

impl From<VehicleEntry> for Vehicle {
    fn from(entry: VehicleEntry) -> Self {
        let mut vehicle = Vehicle::new(entry.imei, entry.name);
        vehicle.model = entry.model;
        vehicle.registration = entry.registration;
        vehicle.battery_kwh = entry.battery_kwh;
        vehicle
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_history_path() -> String {
    DEFAULT_HISTORY_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Load `<path>.toml` (optional) overlaid with `FLEET__SECTION__KEY`
/// environment variables.
pub fn load_app_config(path: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("FLEET")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${name}` placeholders in a URL template, URL-encoding each value
pub fn expand_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, &urlencoding::encode(value));
    }
    result
}
