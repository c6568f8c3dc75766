//! IIO sysfs sensor backend
//!
//! Reads the temperature/humidity/CO2 channels a DHT22 + MH-Z19 rig exposes
//! through the Linux IIO sysfs hierarchy, plus an optional PIR occupancy
//! GPIO. Each channel that fails to read substitutes its documented default
//! so one flaky sensor never takes the control loop down.

use super::{
    SensorSource, DEFAULT_CO2_PPM, DEFAULT_HUMIDITY, DEFAULT_OCCUPANCY, DEFAULT_TEMPERATURE,
};
use crate::models::SensorReading;
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

// IIO channel files, milli-units for temperature and humidity
const TEMP_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";
const CO2_FILE: &str = "in_concentration_co2_raw";

/// Sensor source reading from an IIO device directory
pub struct HardwareSensorSource {
    sensor_root: PathBuf,
    occupancy_value_path: Option<PathBuf>,
}

impl HardwareSensorSource {
    pub fn new(sensor_root: impl Into<PathBuf>) -> Self {
        Self {
            sensor_root: sensor_root.into(),
            occupancy_value_path: None,
        }
    }

    /// Wire a PIR motion sensor exposed as a GPIO value file
    pub fn with_occupancy_gpio(mut self, value_path: impl Into<PathBuf>) -> Self {
        self.occupancy_value_path = Some(value_path.into());
        self
    }

    /// A device that exposes the temperature channel counts as present
    pub async fn is_available(&self) -> bool {
        fs::metadata(self.sensor_root.join(TEMP_FILE)).await.is_ok()
    }

    async fn read_channel(&self, filename: &str) -> Option<f64> {
        let path = self.sensor_root.join(filename);
        let content = fs::read_to_string(&path).await.ok()?;
        content.trim().parse::<f64>().ok()
    }

    async fn read_temperature(&self) -> f64 {
        match self.read_channel(TEMP_FILE).await {
            Some(milli) => milli / 1000.0,
            None => {
                warn!("Failed to read temperature channel, substituting default");
                DEFAULT_TEMPERATURE
            }
        }
    }

    async fn read_humidity(&self) -> f64 {
        match self.read_channel(HUMIDITY_FILE).await {
            Some(milli) => milli / 1000.0,
            None => {
                warn!("Failed to read humidity channel, substituting default");
                DEFAULT_HUMIDITY
            }
        }
    }

    async fn read_co2(&self) -> u32 {
        match self.read_channel(CO2_FILE).await {
            Some(ppm) if ppm >= 0.0 => ppm as u32,
            _ => {
                warn!("Failed to read CO2 channel, substituting default");
                DEFAULT_CO2_PPM
            }
        }
    }

    async fn read_occupancy(&self) -> u8 {
        let Some(path) = &self.occupancy_value_path else {
            return DEFAULT_OCCUPANCY;
        };
        match fs::read_to_string(path).await {
            Ok(content) if content.trim() == "1" => 1,
            Ok(_) => 0,
            Err(_) => {
                warn!("Failed to read occupancy GPIO, assuming unoccupied");
                DEFAULT_OCCUPANCY
            }
        }
    }
}

#[async_trait]
impl SensorSource for HardwareSensorSource {
    async fn read(&self) -> Result<SensorReading> {
        Ok(SensorReading {
            temperature: self.read_temperature().await,
            humidity: self.read_humidity().await,
            co2_level: self.read_co2().await,
            occupancy: self.read_occupancy().await,
        })
    }

    fn name(&self) -> &'static str {
        "hardware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_channel(dir: &TempDir, filename: &str, content: &str) {
        fs::write(dir.path().join(filename), content).await.unwrap();
    }

    #[tokio::test]
    async fn test_not_available_without_temperature_channel() {
        let dir = TempDir::new().unwrap();
        let source = HardwareSensorSource::new(dir.path());
        assert!(!source.is_available().await);
    }

    #[tokio::test]
    async fn test_reads_milli_unit_channels() {
        let dir = TempDir::new().unwrap();
        write_channel(&dir, TEMP_FILE, "23500\n").await;
        write_channel(&dir, HUMIDITY_FILE, "48200\n").await;
        write_channel(&dir, CO2_FILE, "612\n").await;

        let source = HardwareSensorSource::new(dir.path());
        assert!(source.is_available().await);

        let reading = source.read().await.unwrap();
        assert!((reading.temperature - 23.5).abs() < 1e-9);
        assert!((reading.humidity - 48.2).abs() < 1e-9);
        assert_eq!(reading.co2_level, 612);
        assert_eq!(reading.occupancy, 0);
    }

    #[tokio::test]
    async fn test_missing_channels_substitute_defaults() {
        let dir = TempDir::new().unwrap();
        write_channel(&dir, TEMP_FILE, "21000").await;

        let source = HardwareSensorSource::new(dir.path());
        let reading = source.read().await.unwrap();

        assert!((reading.temperature - 21.0).abs() < 1e-9);
        assert_eq!(reading.humidity, DEFAULT_HUMIDITY);
        assert_eq!(reading.co2_level, DEFAULT_CO2_PPM);
    }

    #[tokio::test]
    async fn test_garbage_channel_substitutes_default() {
        let dir = TempDir::new().unwrap();
        write_channel(&dir, TEMP_FILE, "not-a-number").await;

        let source = HardwareSensorSource::new(dir.path());
        let reading = source.read().await.unwrap();
        assert_eq!(reading.temperature, DEFAULT_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_occupancy_gpio() {
        let dir = TempDir::new().unwrap();
        write_channel(&dir, TEMP_FILE, "22000").await;
        let pir = dir.path().join("gpio4_value");
        fs::write(&pir, "1\n").await.unwrap();

        let source = HardwareSensorSource::new(dir.path()).with_occupancy_gpio(&pir);
        assert_eq!(source.read().await.unwrap().occupancy, 1);

        fs::write(&pir, "0\n").await.unwrap();
        assert_eq!(source.read().await.unwrap().occupancy, 0);
    }
}
