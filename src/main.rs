// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use fleet_telemetry::application::analytics_service::AnalyticsService;
use fleet_telemetry::application::vehicle_service::VehicleService;
use fleet_telemetry::infrastructure::config::{DEFAULT_CONFIG_PATH, load_app_config};
use fleet_telemetry::infrastructure::telematics_client::TelematicsClient;
use fleet_telemetry::infrastructure::vehicle_directory::StaticVehicleDirectory;
use fleet_telemetry::presentation::app_state::AppState;
use fleet_telemetry::presentation::router::build_router;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config_path = std::env::var("FLEET_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_app_config(&config_path)?;

    // Create repositories (infrastructure layer)
    let telemetry = Arc::new(TelematicsClient::new(&config.telematics)?);
    let directory = Arc::new(StaticVehicleDirectory::from_entries(config.vehicles));
    tracing::info!("Loaded {} vehicles into the directory", directory.len());

    // Create services (application layer)
    let analytics_service = AnalyticsService::new(telemetry, directory.clone(), config.analytics);
    let vehicle_service = VehicleService::new(directory);

    // Create application state
    let state = Arc::new(AppState {
        analytics_service,
        vehicle_service,
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting fleet-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
