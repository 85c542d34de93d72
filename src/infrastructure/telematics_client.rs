// Telematics API repository implementation
use crate::application::telemetry_repository::{FetchError, TelemetryRepository};
use crate::domain::report::DateRange;
use crate::domain::telemetry::RawSeries;
use crate::infrastructure::config::{TelematicsSettings, expand_template};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TelematicsClient {
    client: reqwest::Client,
    base_url: String,
    history_path: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    results: Vec<HistoryResult>,
}

#[derive(Debug, Deserialize)]
struct HistoryResult {
    #[serde(default)]
    series: Option<Vec<RawSeries>>,
    #[serde(default)]
    error: Option<String>,
}

impl TelematicsClient {
    pub fn new(settings: &TelematicsSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            history_path: settings.history_path.clone(),
            token: settings.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn build_history_url(&self, imei: &str, range: &DateRange) -> String {
        let mut vars = HashMap::new();
        vars.insert("imei".to_string(), imei.to_string());
        vars.insert("start".to_string(), range.start_param());
        vars.insert("end".to_string(), range.end_param());

        let path = expand_template(&self.history_path, &vars);
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Pull every series out of a decoded history response, failing on the
/// first error entry.
fn collect_series(response: HistoryResponse) -> Result<Vec<RawSeries>, FetchError> {
    let mut series = Vec::new();
    for result in response.results {
        if let Some(error) = result.error {
            return Err(FetchError::Upstream(error));
        }
        series.extend(result.series.unwrap_or_default());
    }
    Ok(series)
}

#[async_trait]
impl TelemetryRepository for TelematicsClient {
    async fn fetch_history(&self, imei: &str, range: &DateRange) -> Result<Vec<RawSeries>, FetchError> {
        let url = self.build_history_url(imei, range);
        tracing::debug!("Fetching history: {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let data = response
            .json::<HistoryResponse>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let series = collect_series(data)?;
        tracing::debug!(
            "Got {} series ({} rows) for {}",
            series.len(),
            series.iter().map(RawSeries::row_count).sum::<usize>(),
            imei
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client(base_url: &str, history_path: &str) -> TelematicsClient {
        TelematicsClient::new(&TelematicsSettings {
            base_url: base_url.to_string(),
            history_path: history_path.to_string(),
            token: Some(String::new()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_history_url() {
        let c = client(
            "https://telematics.example.com/api/",
            crate::infrastructure::config::DEFAULT_HISTORY_PATH,
        );
        assert_eq!(
            c.build_history_url("860906041234567", &range()),
            "https://telematics.example.com/api/devices/860906041234567/history?startDate=01-03-2024&endDate=07-03-2024"
        );
        assert!(c.token.is_none());

        let c = client("http://localhost:9000", "v1/history/${imei}?from=${start}&to=${end}");
        assert_eq!(
            c.build_history_url("42", &range()),
            "http://localhost:9000/v1/history/42?from=01-03-2024&to=07-03-2024"
        );
    }

    #[test]
    fn test_collect_series() {
        let body = r#"{
            "results": [
                {"series": [{"name": "history", "columns": ["time", "speed"], "values": [["2024-03-01T08:00:00Z", 12]]}]},
                {},
                {"series": [{"columns": ["time"], "values": []}]}
            ]
        }"#;
        let response: HistoryResponse = serde_json::from_str(body).unwrap();
        let series = collect_series(response).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].columns, vec!["time", "speed"]);
        assert_eq!(series[0].row_count(), 1);
    }

    #[test]
    fn test_collect_series_error_entry() {
        let body = r#"{"results": [{"error": "device not found"}]}"#;
        let response: HistoryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            collect_series(response),
            Err(FetchError::Upstream("device not found".to_string()))
        );
    }
}
