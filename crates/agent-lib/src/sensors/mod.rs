//! Sensor acquisition for the conditioned space
//!
//! The control loop consumes whatever `SensorReading` it is handed; whether
//! the values came from real hardware or the simulator is transparent to it.
//! Backend selection happens once at startup via an availability probe, with
//! the simulator as the universal fallback.

mod hardware;
mod simulated;

pub use hardware::HardwareSensorSource;
pub use simulated::SimulatedSensorSource;

use crate::models::SensorReading;
use anyhow::Result;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;

pub use async_trait::async_trait;

/// Documented substitute values used when a sensor read fails
pub const DEFAULT_TEMPERATURE: f64 = 22.0;
pub const DEFAULT_HUMIDITY: f64 = 50.0;
pub const DEFAULT_CO2_PPM: u32 = 400;
pub const DEFAULT_OCCUPANCY: u8 = 0;

/// The reading the loop falls back to so a sensor failure never stalls it
pub fn fallback_reading() -> SensorReading {
    SensorReading {
        temperature: DEFAULT_TEMPERATURE,
        humidity: DEFAULT_HUMIDITY,
        co2_level: DEFAULT_CO2_PPM,
        occupancy: DEFAULT_OCCUPANCY,
    }
}

/// Trait for sensor acquisition implementations
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Capture one reading of the space
    async fn read(&self) -> Result<SensorReading>;

    /// Short backend identifier for logs
    fn name(&self) -> &'static str;
}

/// Probe for hardware sensors once at startup and fall back to simulation
pub async fn create_sensor_source(sensor_root: &Path) -> Arc<dyn SensorSource> {
    let hardware = HardwareSensorSource::new(sensor_root);
    if hardware.is_available().await {
        tracing::info!(root = %sensor_root.display(), "Detected hardware sensors");
        Arc::new(hardware)
    } else {
        tracing::warn!("No hardware sensors found, using simulated sensor data");
        Arc::new(SimulatedSensorSource::new())
    }
}

/// Simulated energy rate in $ per kWh, surfaced on the control surface
pub fn estimate_energy_rate() -> f64 {
    let rate: f64 = rand::thread_rng().gen_range(0.08..0.30);
    (rate * 100.0).round() / 100.0
}
