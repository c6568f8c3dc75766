//! sysfs GPIO actuator backend
//!
//! Drives the fan, heater, and ac relays through the legacy GPIO sysfs
//! interface: pins are exported once at startup, set as outputs, and each
//! dispatch writes 0/1 to the pin value files. The root path is injectable
//! so tests run against a temp directory.

use super::ActuatorSink;
use crate::models::{ActuatorState, DeviceState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// BCM pin assignments for the three relays
pub const FAN_PIN: u8 = 17;
pub const HEATER_PIN: u8 = 27;
pub const AC_PIN: u8 = 22;

/// Actuator sink writing to `/sys/class/gpio`-style pin files
pub struct GpioSink {
    gpio_root: PathBuf,
}

impl GpioSink {
    pub fn new(gpio_root: impl Into<PathBuf>) -> Self {
        Self {
            gpio_root: gpio_root.into(),
        }
    }

    /// The sysfs export handle counts as hardware presence
    pub async fn is_available(gpio_root: &Path) -> bool {
        fs::metadata(gpio_root.join("export")).await.is_ok()
    }

    /// Export all pins, set them as outputs, and switch everything off
    pub async fn init(&self) -> Result<()> {
        for pin in [FAN_PIN, HEATER_PIN, AC_PIN] {
            self.export_pin(pin).await?;
            self.set_direction(pin, "out").await?;
            self.write_pin(pin, false).await?;
        }
        Ok(())
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.gpio_root.join(format!("gpio{pin}"))
    }

    async fn export_pin(&self, pin: u8) -> Result<()> {
        if fs::metadata(self.pin_dir(pin)).await.is_ok() {
            // Already exported
            return Ok(());
        }
        fs::write(self.gpio_root.join("export"), pin.to_string())
            .await
            .with_context(|| format!("Failed to export GPIO pin {pin}"))?;
        Ok(())
    }

    async fn set_direction(&self, pin: u8, direction: &str) -> Result<()> {
        fs::write(self.pin_dir(pin).join("direction"), direction)
            .await
            .with_context(|| format!("Failed to set direction on GPIO pin {pin}"))?;
        Ok(())
    }

    async fn write_pin(&self, pin: u8, on: bool) -> Result<()> {
        let value = if on { "1" } else { "0" };
        fs::write(self.pin_dir(pin).join("value"), value)
            .await
            .with_context(|| format!("Failed to write GPIO pin {pin}"))?;
        Ok(())
    }
}

#[async_trait]
impl ActuatorSink for GpioSink {
    async fn apply(&self, state: &ActuatorState) -> Result<()> {
        self.write_pin(FAN_PIN, state.fan == DeviceState::On).await?;
        self.write_pin(AC_PIN, state.ac == DeviceState::On).await?;
        self.write_pin(HEATER_PIN, state.heater == DeviceState::On)
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gpio"
    }
}
