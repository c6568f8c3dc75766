//! HTTP control surface, health checks, and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hvac_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::AgentMetrics,
    ControlLoop,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Accepted setpoint range in °C
const MIN_SETPOINT: f64 = 5.0;
const MAX_SETPOINT: f64 = 40.0;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlLoop>,
    pub health_registry: HealthRegistry,
    pub metrics: AgentMetrics,
}

impl AppState {
    pub fn new(
        control: Arc<ControlLoop>,
        health_registry: HealthRegistry,
        metrics: AgentMetrics,
    ) -> Self {
        Self {
            control,
            health_registry,
            metrics,
        }
    }
}

/// User-submitted desired temperature
#[derive(Debug, Deserialize)]
pub struct SetTemperatureRequest {
    pub temperature: f64,
}

/// Echo of the accepted override
#[derive(Debug, Serialize)]
pub struct SetTemperatureResponse {
    pub message: String,
    pub temperature: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Live sensor reading plus the model's prediction
async fn sensor_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.control.snapshot().await)
}

/// Accept a user override: store it, retrain, drive the actuators, and echo
/// the accepted temperature back
async fn set_temperature(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetTemperatureRequest>,
) -> Response {
    if !request.temperature.is_finite()
        || !(MIN_SETPOINT..=MAX_SETPOINT).contains(&request.temperature)
    {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: format!(
                    "temperature must be between {MIN_SETPOINT} and {MAX_SETPOINT} °C"
                ),
            }),
        )
            .into_response();
    }

    match state.control.apply_override(request.temperature).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(SetTemperatureResponse {
                message: "Temperature updated".to_string(),
                temperature: outcome.accepted_temperature,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sensor_data", get(sensor_data))
        .route("/set_temperature", post(set_temperature))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
