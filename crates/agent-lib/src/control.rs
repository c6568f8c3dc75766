//! Control loop orchestration
//!
//! One cycle is read sensors → predict the desired temperature → decide →
//! dispatch to the active sink. Cycles are strictly sequential: the timer
//! tick, the control-surface override path, and the snapshot path all go
//! through the same loop instance, and actuation is serialized by a cycle
//! guard so conflicting commands never interleave.

use crate::actuator::{decide, ActuatorSink};
use crate::error::ControlError;
use crate::health::{components, HealthRegistry};
use crate::model::SetpointModel;
use crate::models::{ActuatorState, SensorReading, SensorSnapshot};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::sensors::{estimate_energy_rate, fallback_reading, SensorSource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Configuration for the control loop
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Interval between scheduled control cycles
    pub cycle_interval: Duration,
    /// Setpoint used while no trained model is available
    pub default_setpoint: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(30),
            default_setpoint: 22.0,
        }
    }
}

/// Result of one control cycle
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub reading: SensorReading,
    pub desired: f64,
    /// False when the default setpoint stood in for a missing model
    pub from_model: bool,
    pub state: ActuatorState,
    /// False when the sink rejected the dispatch; `state` is still the
    /// intended decision
    pub dispatched: bool,
}

/// Result of a user override
#[derive(Debug, Clone)]
pub struct OverrideOutcome {
    pub accepted_temperature: f64,
    pub examples: usize,
    pub state: ActuatorState,
    pub dispatched: bool,
}

/// Orchestrates sensors, model, and actuators
pub struct ControlLoop {
    sensors: Arc<dyn SensorSource>,
    model: Arc<SetpointModel>,
    sink: Arc<dyn ActuatorSink>,
    config: ControlConfig,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    health: HealthRegistry,
    // Held across read→predict→dispatch so cycles never overlap
    cycle_guard: Mutex<()>,
}

impl ControlLoop {
    pub fn new(
        sensors: Arc<dyn SensorSource>,
        model: Arc<SetpointModel>,
        sink: Arc<dyn ActuatorSink>,
        config: ControlConfig,
        metrics: AgentMetrics,
        logger: StructuredLogger,
        health: HealthRegistry,
    ) -> Self {
        Self {
            sensors,
            model,
            sink,
            config,
            metrics,
            logger,
            health,
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn model(&self) -> &Arc<SetpointModel> {
        &self.model
    }

    /// Current reading plus prediction for the control surface; no actuation
    pub async fn snapshot(&self) -> SensorSnapshot {
        let reading = self.read_sensors().await;
        let predicted = self.try_predict(&reading);
        self.metrics.set_temperatures(reading.temperature, predicted);

        SensorSnapshot {
            reading,
            energy_cost: estimate_energy_rate(),
            predicted_temperature: predicted,
        }
    }

    /// Run one full read → predict → decide → dispatch cycle
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _guard = self.cycle_guard.lock().await;

        let reading = self.read_sensors().await;
        let (desired, from_model) = match self.try_predict(&reading) {
            Some(predicted) => {
                self.logger.log_prediction(&reading, predicted);
                (predicted, true)
            }
            None => {
                self.logger.log_cold_start(self.config.default_setpoint);
                (self.config.default_setpoint, false)
            }
        };

        let state = decide(desired, reading.temperature);
        let dispatched = self.dispatch(&state).await;

        self.metrics.inc_control_cycles();
        self.metrics
            .set_temperatures(reading.temperature, from_model.then_some(desired));
        self.metrics.set_mode(state.mode());

        CycleOutcome {
            reading,
            desired,
            from_model,
            state,
            dispatched,
        }
    }

    /// Record a user override as a training example, retrain, then drive the
    /// actuators toward the user's temperature. Echoes the accepted value.
    pub async fn apply_override(
        &self,
        user_temperature: f64,
    ) -> Result<OverrideOutcome, ControlError> {
        let _guard = self.cycle_guard.lock().await;

        let reading = self.read_sensors().await;

        let start = Instant::now();
        let model = Arc::clone(&self.model);
        let training_reading = reading.clone();
        let examples = tokio::task::spawn_blocking(move || {
            model.incorporate_override(&training_reading, user_temperature)
        })
        .await
        .map_err(|e| ControlError::Training(e.to_string()))??;

        self.metrics
            .observe_training_latency(start.elapsed().as_secs_f64());
        self.metrics.inc_overrides();
        self.metrics.inc_retrains();
        self.metrics.set_training_examples(examples as i64);
        self.health.set_healthy(components::MODEL).await;
        self.logger.log_override(user_temperature, examples);

        let state = decide(user_temperature, reading.temperature);
        let dispatched = self.dispatch(&state).await;
        self.metrics.set_mode(state.mode());

        Ok(OverrideOutcome {
            accepted_temperature: user_temperature,
            examples,
            state,
            dispatched,
        })
    }

    /// Run scheduled control cycles until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.cycle_interval.as_secs(),
            default_setpoint = self.config.default_setpoint,
            sink = self.sink.name(),
            "Starting control loop"
        );

        let mut ticker = interval(self.config.cycle_interval);
        let mut cycle_count = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.run_cycle().await;
                    cycle_count += 1;

                    if cycle_count % 10 == 0 {
                        debug!(
                            cycles = cycle_count,
                            mode = outcome.state.mode().as_str(),
                            desired = outcome.desired,
                            current = outcome.reading.temperature,
                            "Control cycle cadence"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down control loop");
                    break;
                }
            }
        }
    }

    async fn read_sensors(&self) -> SensorReading {
        match self.sensors.read().await {
            Ok(reading) => {
                self.health.set_healthy(components::SENSORS).await;
                reading
            }
            Err(e) => {
                warn!(error = %e, "Sensor read failed, substituting defaults");
                self.metrics.inc_sensor_errors();
                self.health
                    .set_degraded(components::SENSORS, format!("read failed: {e}"))
                    .await;
                fallback_reading()
            }
        }
    }

    /// Predict the desired temperature, treating a cold start as "no value"
    fn try_predict(&self, reading: &SensorReading) -> Option<f64> {
        let start = Instant::now();
        match self.model.predict(reading) {
            Ok(predicted) => {
                self.metrics
                    .observe_prediction_latency(start.elapsed().as_secs_f64());
                Some(predicted)
            }
            Err(ControlError::NoModelAvailable) => None,
            Err(e) => {
                warn!(error = %e, "Prediction failed");
                None
            }
        }
    }

    async fn dispatch(&self, state: &ActuatorState) -> bool {
        match self.sink.apply(state).await {
            Ok(()) => {
                self.logger.log_dispatch(state, self.sink.name());
                self.health.set_healthy(components::ACTUATORS).await;
                true
            }
            Err(e) => {
                let error = ControlError::ActuatorDispatch(e.to_string());
                warn!(error = %error, "Actuator dispatch failed");
                self.metrics.inc_dispatch_errors();
                self.health
                    .set_degraded(components::ACTUATORS, e.to_string())
                    .await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedSink;
    use crate::model::ArtifactStore;
    use crate::models::TrainingExample;
    use crate::sensors::async_trait;
    use crate::store::PreferenceStore;
    use anyhow::anyhow;
    use tempfile::TempDir;

    struct FixedSensor(SensorReading);

    #[async_trait]
    impl SensorSource for FixedSensor {
        async fn read(&self) -> anyhow::Result<SensorReading> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FailingSensor;

    #[async_trait]
    impl SensorSource for FailingSensor {
        async fn read(&self) -> anyhow::Result<SensorReading> {
            Err(anyhow!("sensor bus unavailable"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn hot_reading() -> SensorReading {
        SensorReading {
            temperature: 28.0,
            humidity: 40.0,
            co2_level: 500,
            occupancy: 1,
        }
    }

    fn build_loop(
        dir: &TempDir,
        sensors: Arc<dyn SensorSource>,
    ) -> (Arc<ControlLoop>, Arc<SimulatedSink>) {
        let store = PreferenceStore::new(dir.path().join("data").join("prefs.csv"));
        let artifacts = ArtifactStore::new(dir.path().join("models"));
        let model = Arc::new(SetpointModel::new(store, artifacts));
        let sink = Arc::new(SimulatedSink::new());

        let control = ControlLoop::new(
            sensors,
            model,
            sink.clone(),
            ControlConfig::default(),
            AgentMetrics::new(),
            StructuredLogger::new("test-zone"),
            HealthRegistry::new(),
        );
        (Arc::new(control), sink)
    }

    #[tokio::test]
    async fn test_sensor_failure_substitutes_defaults_and_keeps_running() {
        let dir = TempDir::new().unwrap();
        let (control, sink) = build_loop(&dir, Arc::new(FailingSensor));

        let outcome = control.run_cycle().await;

        assert_eq!(outcome.reading, fallback_reading());
        // Untrained model: default setpoint 22 against default reading 22
        assert!(!outcome.from_model);
        assert_eq!(outcome.desired, 22.0);
        assert_eq!(outcome.state, ActuatorState::idle());
        assert!(outcome.dispatched);
        assert_eq!(sink.last_applied(), Some(ActuatorState::idle()));
    }

    #[tokio::test]
    async fn test_cycle_with_trained_model_cools_a_hot_room() {
        let dir = TempDir::new().unwrap();
        let (control, sink) = build_loop(&dir, Arc::new(FixedSensor(hot_reading())));

        // Everyone preferred 22 regardless of context
        for i in 0..6 {
            control
                .model()
                .store()
                .append(&TrainingExample {
                    temperature: 20.0 + i as f64 * 2.0,
                    humidity: 35.0 + i as f64 * 5.0,
                    co2_level: 400 + i * 100,
                    occupancy: (i % 2) as u8,
                    desired_temperature: 22.0,
                })
                .unwrap();
        }

        let outcome = control.run_cycle().await;

        assert!(outcome.from_model);
        assert!((outcome.desired - 22.0).abs() < 1e-9);
        assert_eq!(outcome.state, ActuatorState::cooling());
        assert_eq!(sink.last_applied(), Some(ActuatorState::cooling()));
    }

    #[tokio::test]
    async fn test_override_trains_and_drives_toward_user_value() {
        let dir = TempDir::new().unwrap();
        let (control, sink) = build_loop(&dir, Arc::new(FixedSensor(hot_reading())));

        let outcome = control.apply_override(22.0).await.unwrap();

        assert_eq!(outcome.accepted_temperature, 22.0);
        assert_eq!(outcome.examples, 1);
        assert_eq!(outcome.state, ActuatorState::cooling());
        assert!(outcome.dispatched);
        assert_eq!(sink.last_applied(), Some(ActuatorState::cooling()));
        assert!(control.model().is_trained());
    }

    #[tokio::test]
    async fn test_snapshot_reports_null_prediction_on_cold_start() {
        let dir = TempDir::new().unwrap();
        let (control, _sink) = build_loop(&dir, Arc::new(FixedSensor(hot_reading())));

        let snapshot = control.snapshot().await;

        assert_eq!(snapshot.reading, hot_reading());
        assert!(snapshot.predicted_temperature.is_none());
        assert!((0.08..=0.30).contains(&snapshot.energy_cost));
    }

    #[tokio::test]
    async fn test_snapshot_after_override_includes_prediction() {
        let dir = TempDir::new().unwrap();
        let (control, _sink) = build_loop(&dir, Arc::new(FixedSensor(hot_reading())));

        control.apply_override(23.0).await.unwrap();
        let snapshot = control.snapshot().await;

        assert_eq!(snapshot.predicted_temperature, Some(23.0));
    }
}
