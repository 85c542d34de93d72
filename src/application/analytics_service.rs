// Analytics service - fetch history, run the pipeline, label the result
use crate::application::error::ServiceError;
use crate::application::telemetry_repository::{FetchError, TelemetryRepository, VehicleRepository};
use crate::domain::pipeline::{PipelineConfig, PipelineOutput, aggregate};
use crate::domain::report::{DateRange, VehicleReport};
use crate::domain::telemetry::RawSeries;
use crate::domain::vehicle::Vehicle;
use crate::infrastructure::config::AnalyticsSettings;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

type SharedRun = Shared<BoxFuture<'static, Result<Arc<PipelineOutput>, FetchError>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RunKey {
    imei: String,
    range: DateRange,
}

#[derive(Clone)]
pub struct AnalyticsService {
    telemetry: Arc<dyn TelemetryRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    settings: AnalyticsSettings,
    in_flight: Arc<Mutex<HashMap<RunKey, SharedRun>>>,
}

impl AnalyticsService {
    pub fn new(
        telemetry: Arc<dyn TelemetryRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        settings: AnalyticsSettings,
    ) -> Self {
        Self {
            telemetry,
            vehicles,
            settings,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        self.settings.pipeline()
    }

    /// Run the pipeline over caller-supplied rows; no I/O involved.
    pub fn compute(&self, series: &[RawSeries]) -> PipelineOutput {
        aggregate(series, &self.pipeline_config())
    }

    /// Build the analytics report for one vehicle over a date range.
    pub async fn vehicle_report(
        &self,
        imei: &str,
        range: DateRange,
    ) -> Result<VehicleReport, ServiceError> {
        let vehicle = self.label(imei).await;
        let output = self.run_coalesced(imei, range).await?;

        Ok(VehicleReport::new(
            vehicle,
            range,
            PipelineOutput::clone(&output),
            self.settings.max_chart_points,
        ))
    }

    async fn label(&self, imei: &str) -> Vehicle {
        match self.vehicles.find_vehicle(imei).await {
            Ok(Some(vehicle)) => vehicle,
            Ok(None) => Vehicle::unlabelled(imei),
            Err(e) => {
                tracing::warn!("Vehicle lookup failed for {}: {}", imei, e);
                Vehicle::unlabelled(imei)
            }
        }
    }

    /// At most one fetch+aggregate per (IMEI, range) is in flight; concurrent
    /// callers with the same key await the same run. Nothing is kept once the
    /// run completes.
    async fn run_coalesced(
        &self,
        imei: &str,
        range: DateRange,
    ) -> Result<Arc<PipelineOutput>, FetchError> {
        let key = RunKey {
            imei: imei.to_string(),
            range,
        };

        let run = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight analytics run for {}", imei);
                    existing.clone()
                }
                None => {
                    let run = self.start_run(key.clone());
                    in_flight.insert(key, run.clone());
                    run
                }
            }
        };

        run.await
    }

    /// The work runs on its own task so it finishes, and leaves `in_flight`,
    /// even when every caller awaiting it has gone away.
    fn start_run(&self, key: RunKey) -> SharedRun {
        let telemetry = self.telemetry.clone();
        let in_flight = self.in_flight.clone();
        let config = self.pipeline_config();

        let task = tokio::spawn(async move {
            let _entry = InFlightEntry {
                in_flight,
                key: key.clone(),
            };
            let started = Instant::now();
            match telemetry.fetch_history(&key.imei, &key.range).await {
                Ok(series) => {
                    let output = aggregate(&series, &config);
                    tracing::info!(
                        "Analytics for {} ({}..{}): {} samples, {} skipped, {} trips in {:?}",
                        key.imei,
                        key.range.start_param(),
                        key.range.end_param(),
                        output.summary.total_samples,
                        output.skipped_rows,
                        output.trips.len(),
                        started.elapsed()
                    );
                    Ok(Arc::new(output))
                }
                Err(e) => {
                    tracing::warn!("History fetch failed for {}: {}", key.imei, e);
                    Err(e)
                }
            }
        });

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!("Analytics task failed: {}", e);
                Err(FetchError::Upstream(format!("analytics run aborted: {}", e)))
            })
        }
        .boxed()
        .shared()
    }
}

/// Removes a run from the in-flight map when its task ends, including on
/// panic.
struct InFlightEntry {
    in_flight: Arc<Mutex<HashMap<RunKey, SharedRun>>>,
    key: RunKey,
}

impl Drop for InFlightEntry {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowTelemetry {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TelemetryRepository for SlowTelemetry {
        async fn fetch_history(
            &self,
            _imei: &str,
            _range: &DateRange,
        ) -> Result<Vec<RawSeries>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                return Err(FetchError::Status {
                    status: 503,
                    body: "maintenance".into(),
                });
            }
            Ok(vec![RawSeries::new(
                vec!["time".into(), "lat".into(), "lon".into(), "speed".into(), "ignition".into()],
                vec![
                    vec![json!("2024-03-01T08:00:00Z"), json!(12.9716), json!(77.5946), json!(30), json!(1)],
                    vec![json!("2024-03-01T08:00:10Z"), json!(12.9720), json!(77.5950), json!(30), json!(1)],
                ],
            )])
        }
    }

    struct Directory(Vec<Vehicle>);

    #[async_trait]
    impl VehicleRepository for Directory {
        async fn list_vehicles(&self) -> anyhow::Result<Vec<Vehicle>> {
            Ok(self.0.clone())
        }

        async fn find_vehicle(&self, imei: &str) -> anyhow::Result<Option<Vehicle>> {
            Ok(self.0.iter().find(|v| v.imei == imei).cloned())
        }
    }

    fn service(fail: bool) -> (AnalyticsService, Arc<SlowTelemetry>) {
        let telemetry = Arc::new(SlowTelemetry {
            calls: AtomicUsize::new(0),
            fail,
        });
        let vehicles = Arc::new(Directory(vec![Vehicle::new(
            "111".to_string(),
            Some("Depot Van 3".to_string()),
        )]));
        let service = AnalyticsService::new(telemetry.clone(), vehicles, AnalyticsSettings::default());
        (service, telemetry)
    }

    fn range() -> DateRange {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        DateRange::new(day, day).unwrap()
    }

    #[tokio::test]
    async fn test_report_is_labelled() {
        let (service, _) = service(false);
        let report = service.vehicle_report("111", range()).await.unwrap();
        assert_eq!(report.vehicle.name, "Depot Van 3");
        assert_eq!(report.trips.len(), 1);
        assert_eq!(report.summary.moving_sample_count, 2);

        let report = service.vehicle_report("999", range()).await.unwrap();
        assert_eq!(report.vehicle.name, "Vehicle 999");
        assert_eq!(report.summary.total_samples, 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let (service, telemetry) = service(false);
        let (a, b, c) = tokio::join!(
            service.vehicle_report("111", range()),
            service.vehicle_report("111", range()),
            service.vehicle_report("111", range()),
        );
        assert_eq!(telemetry.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().summary, b.unwrap().summary);
        assert!(c.is_ok());

        // Completed runs are not cached
        service.vehicle_report("111", range()).await.unwrap();
        assert_eq!(telemetry.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let (service, _) = service(true);
        let err = service.vehicle_report("111", range()).await.unwrap_err();
        match err {
            ServiceError::Fetch(e) => assert!(e.is_retryable()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(service.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_requests_still_clear_in_flight() {
        let (service, telemetry) = service(false);
        for i in 0..5 {
            let imei = format!("abandoned-{i}");
            let result = tokio::time::timeout(
                Duration::from_millis(5),
                service.vehicle_report(&imei, range()),
            )
            .await;
            assert!(result.is_err());
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(service.in_flight.lock().unwrap().is_empty());
        assert_eq!(telemetry.calls.load(Ordering::SeqCst), 5);

        // A fresh request starts a new fetch instead of resuming an old one
        service.vehicle_report("abandoned-0", range()).await.unwrap();
        assert_eq!(telemetry.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_compute_is_pure() {
        let (service, _) = service(false);
        let series = vec![RawSeries::new(
            vec!["time".into(), "speed".into()],
            vec![vec![json!("2024-03-01T08:00:00Z"), json!(90)]],
        )];
        let first = service.compute(&series);
        let second = service.compute(&series);
        assert_eq!(first, second);
        assert_eq!(first.summary.drive_modes.power, 100.0);
    }
}
