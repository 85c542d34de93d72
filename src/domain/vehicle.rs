// Vehicle metadata domain model
use serde::{Deserialize, Serialize};

/// Descriptive attributes of a fleet vehicle, keyed by the telematics
/// device IMEI. Used only to label reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub imei: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_kwh: Option<f64>,
}

impl Vehicle {
    pub fn new(imei: String, name: Option<String>) -> Self {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| Self::format_name(&imei));
        Self {
            imei,
            name,
            model: None,
            registration: None,
            battery_kwh: None,
        }
    }

    /// Placeholder for devices the directory doesn't know.
    pub fn unlabelled(imei: &str) -> Self {
        Self::new(imei.to_string(), None)
    }

    fn format_name(imei: &str) -> String {
        // Convert "860906041234567" to "Vehicle 4567"
        let digits = imei.trim();
        let tail_start = digits
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("Vehicle {}", &digits[tail_start..])
    }
}
