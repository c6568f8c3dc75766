//! HVAC Agent - adaptive temperature control daemon
//!
//! Runs the sensor → predict → actuate control loop on a timer and exposes
//! the HTTP control surface for the dashboard and CLI.

use anyhow::Result;
use hvac_lib::{
    actuator, control::ControlConfig, health::components, model::ArtifactStore, sensors,
    AgentMetrics, ControlLoop, HealthRegistry, PreferenceStore, SetpointModel, StructuredLogger,
    TrainOutcome,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting hvac-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    info!(zone = %config.zone_name, port = config.api_port, "Agent configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SENSORS).await;
    health_registry.register(components::MODEL).await;
    health_registry.register(components::STORE).await;
    health_registry.register(components::ACTUATORS).await;

    // Initialize metrics and structured logger
    let metrics = AgentMetrics::new();
    let logger = StructuredLogger::new(&config.zone_name);

    // Build the model from the preference history and persisted artifacts
    let store = PreferenceStore::new(&config.data_path);
    let artifacts = ArtifactStore::new(&config.model_dir);
    let model = Arc::new(SetpointModel::new(store, artifacts));

    if !model.bootstrap()? {
        match model.train()? {
            TrainOutcome::Trained { examples } => {
                metrics.set_training_examples(examples as i64);
                info!(examples, "Trained setpoint model from history");
            }
            TrainOutcome::NoData => {
                warn!("No preference data yet, starting untrained");
            }
        }
    }
    logger.log_startup(AGENT_VERSION, model.is_trained());

    // Probe collaborators once at startup
    let sensor_source = sensors::create_sensor_source(Path::new(&config.sensor_root)).await;
    let sink = actuator::create_sink(
        Path::new(&config.gpio_root),
        config.remote_endpoint.as_deref(),
    )
    .await;

    let control = Arc::new(ControlLoop::new(
        sensor_source,
        model,
        sink,
        ControlConfig {
            cycle_interval: Duration::from_secs(config.cycle_interval_secs),
            default_setpoint: config.default_setpoint,
        },
        metrics.clone(),
        logger.clone(),
        health_registry.clone(),
    ));

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        control.clone(),
        health_registry.clone(),
        metrics.clone(),
    ));

    // Mark agent as ready after initialization
    health_registry.set_ready(true).await;

    // Start the API server and the control loop
    let (shutdown_tx, _) = broadcast::channel(1);
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));
    let loop_handle = tokio::spawn(control.run(shutdown_tx.subscribe()));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;
    api_handle.abort();

    info!("Shutting down");

    Ok(())
}
