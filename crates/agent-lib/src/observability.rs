//! Observability infrastructure for the HVAC agent
//!
//! Provides:
//! - Prometheus metrics (prediction/training latency, temperatures, counters)
//! - Structured JSON logging with tracing

use crate::models::{ActuatorState, HvacMode, SensorReading};
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_gauge, Gauge, GaugeVec,
    Histogram, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AgentMetricsInner {
    prediction_latency_seconds: Histogram,
    training_latency_seconds: Histogram,
    current_temperature_celsius: Gauge,
    predicted_setpoint_celsius: Gauge,
    training_examples: IntGauge,
    hvac_mode_info: GaugeVec,
    control_cycles: IntGauge,
    overrides_received: IntGauge,
    retrains_completed: IntGauge,
    sensor_errors: IntGauge,
    dispatch_errors: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "hvac_agent_prediction_latency_seconds",
                "Time spent predicting the desired temperature",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_latency_seconds: register_histogram!(
                "hvac_agent_training_latency_seconds",
                "Time spent retraining the setpoint model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register training_latency_seconds"),

            current_temperature_celsius: register_gauge!(
                "hvac_agent_current_temperature_celsius",
                "Most recent measured air temperature"
            )
            .expect("Failed to register current_temperature_celsius"),

            predicted_setpoint_celsius: register_gauge!(
                "hvac_agent_predicted_setpoint_celsius",
                "Most recent predicted desired temperature"
            )
            .expect("Failed to register predicted_setpoint_celsius"),

            training_examples: register_int_gauge!(
                "hvac_agent_training_examples",
                "Number of examples in the preference dataset"
            )
            .expect("Failed to register training_examples"),

            hvac_mode_info: register_gauge_vec!(
                "hvac_agent_mode_info",
                "Currently active HVAC mode",
                &["mode"]
            )
            .expect("Failed to register hvac_mode_info"),

            control_cycles: register_int_gauge!(
                "hvac_agent_control_cycles_total",
                "Total number of completed control cycles"
            )
            .expect("Failed to register control_cycles_total"),

            overrides_received: register_int_gauge!(
                "hvac_agent_overrides_total",
                "Total number of user temperature overrides"
            )
            .expect("Failed to register overrides_total"),

            retrains_completed: register_int_gauge!(
                "hvac_agent_retrains_total",
                "Total number of completed model retrains"
            )
            .expect("Failed to register retrains_total"),

            sensor_errors: register_int_gauge!(
                "hvac_agent_sensor_errors_total",
                "Total number of sensor read failures"
            )
            .expect("Failed to register sensor_errors_total"),

            dispatch_errors: register_int_gauge!(
                "hvac_agent_dispatch_errors_total",
                "Total number of actuator dispatch failures"
            )
            .expect("Failed to register dispatch_errors_total"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a prediction latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Record a training latency observation
    pub fn observe_training_latency(&self, duration_secs: f64) {
        self.inner().training_latency_seconds.observe(duration_secs);
    }

    /// Update the measured and predicted temperature gauges
    pub fn set_temperatures(&self, current: f64, predicted: Option<f64>) {
        self.inner().current_temperature_celsius.set(current);
        if let Some(predicted) = predicted {
            self.inner().predicted_setpoint_celsius.set(predicted);
        }
    }

    /// Update the dataset size gauge
    pub fn set_training_examples(&self, count: i64) {
        self.inner().training_examples.set(count);
    }

    /// Update the active mode info gauge
    pub fn set_mode(&self, mode: HvacMode) {
        let gauge = &self.inner().hvac_mode_info;
        gauge.reset();
        gauge.with_label_values(&[mode.as_str()]).set(1.0);
    }

    /// Increment the control cycle counter
    pub fn inc_control_cycles(&self) {
        self.inner().control_cycles.inc();
    }

    /// Increment the override counter
    pub fn inc_overrides(&self) {
        self.inner().overrides_received.inc();
    }

    /// Increment the retrain counter
    pub fn inc_retrains(&self) {
        self.inner().retrains_completed.inc();
    }

    /// Increment the sensor error counter
    pub fn inc_sensor_errors(&self) {
        self.inner().sensor_errors.inc();
    }

    /// Increment the dispatch error counter
    pub fn inc_dispatch_errors(&self) {
        self.inner().dispatch_errors.inc();
    }
}

/// Structured logger for agent events
///
/// Provides consistent JSON-formatted logging for predictions, overrides,
/// retrains, and actuator dispatches.
#[derive(Clone)]
pub struct StructuredLogger {
    zone_name: String,
}

impl StructuredLogger {
    pub fn new(zone_name: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, model_trained: bool) {
        info!(
            event = "agent_startup",
            zone = %self.zone_name,
            version = %version,
            model_trained = model_trained,
            "HVAC agent starting"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            zone = %self.zone_name,
            reason = %reason,
            "HVAC agent shutting down"
        );
    }

    /// Log a setpoint prediction
    pub fn log_prediction(&self, reading: &SensorReading, predicted: f64) {
        info!(
            event = "setpoint_predicted",
            zone = %self.zone_name,
            temperature = reading.temperature,
            humidity = reading.humidity,
            co2_level = reading.co2_level,
            occupancy = reading.occupancy,
            predicted_temperature = predicted,
            "Predicted desired temperature"
        );
    }

    /// Log a user override
    pub fn log_override(&self, user_temperature: f64, examples: usize) {
        info!(
            event = "override_recorded",
            zone = %self.zone_name,
            user_temperature = user_temperature,
            examples = examples,
            "Recorded user preference and retrained"
        );
    }

    /// Log an actuator dispatch
    pub fn log_dispatch(&self, state: &ActuatorState, backend: &str) {
        info!(
            event = "actuators_dispatched",
            zone = %self.zone_name,
            mode = state.mode().as_str(),
            fan = %state.fan,
            ac = %state.ac,
            heater = %state.heater,
            backend = %backend,
            "Dispatched actuator state"
        );
    }

    /// Log a cold-start cycle running on the default setpoint
    pub fn log_cold_start(&self, default_setpoint: f64) {
        warn!(
            event = "cold_start",
            zone = %self.zone_name,
            default_setpoint = default_setpoint,
            "No trained model yet, using default setpoint"
        );
    }
}
