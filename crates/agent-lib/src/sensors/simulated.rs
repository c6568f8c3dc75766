//! Simulated sensor backend for hosts without real sensors

use super::SensorSource;
use crate::models::SensorReading;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

/// Generates plausible readings in the same ranges the real sensors report
pub struct SimulatedSensorSource;

impl SimulatedSensorSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimulatedSensorSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorSource for SimulatedSensorSource {
    async fn read(&self) -> Result<SensorReading> {
        let mut rng = rand::thread_rng();
        Ok(SensorReading {
            temperature: (rng.gen_range(18.0..30.0) * 100.0_f64).round() / 100.0,
            humidity: (rng.gen_range(30.0..70.0) * 100.0_f64).round() / 100.0,
            co2_level: rng.gen_range(350..=1000),
            occupancy: rng.gen_range(0..=1),
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
