//! Core data models for the HVAC agent

use serde::{Deserialize, Serialize};

/// One sensor sweep of the conditioned space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Air temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// CO2 concentration in ppm
    pub co2_level: u32,
    /// 1 if the space is occupied, 0 otherwise
    pub occupancy: u8,
}

/// A single row of the preference dataset: sensor context plus the
/// temperature the user wanted at that moment.
///
/// Rows are append-only; duplicates are allowed and insertion order is the
/// only identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub temperature: f64,
    pub humidity: f64,
    pub co2_level: u32,
    pub occupancy: u8,
    pub desired_temperature: f64,
}

impl TrainingExample {
    pub fn from_reading(reading: &SensorReading, desired_temperature: f64) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            co2_level: reading.co2_level,
            occupancy: reading.occupancy,
            desired_temperature,
        }
    }

    /// All values finite and usable for fitting
    pub fn is_valid(&self) -> bool {
        self.temperature.is_finite()
            && self.humidity.is_finite()
            && self.desired_temperature.is_finite()
    }
}

/// Live snapshot served on the control surface: the current reading, the
/// estimated energy rate, and the model's setpoint prediction when one is
/// available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSnapshot {
    #[serde(flatten)]
    pub reading: SensorReading,
    /// Estimated energy rate in $ per kWh
    pub energy_cost: f64,
    /// Predicted desired temperature, absent while the model is untrained
    pub predicted_temperature: Option<f64>,
}

/// On/off state of a single actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    pub fn is_on(&self) -> bool {
        matches!(self, DeviceState::On)
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::On => write!(f, "ON"),
            DeviceState::Off => write!(f, "OFF"),
        }
    }
}

/// Operating mode derived from the actuator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    Cooling,
    Heating,
    Idle,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Cooling => "cooling",
            HvacMode::Heating => "heating",
            HvacMode::Idle => "idle",
        }
    }
}

/// Commanded state of the three actuators.
///
/// Invariant: only the three mode constructors produce values, so heater and
/// ac are never on together and the fan runs only alongside the ac.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub fan: DeviceState,
    pub ac: DeviceState,
    pub heater: DeviceState,
}

impl ActuatorState {
    /// Fan and ac on, heater off
    pub fn cooling() -> Self {
        Self {
            fan: DeviceState::On,
            ac: DeviceState::On,
            heater: DeviceState::Off,
        }
    }

    /// Heater alone
    pub fn heating() -> Self {
        Self {
            fan: DeviceState::Off,
            ac: DeviceState::Off,
            heater: DeviceState::On,
        }
    }

    /// Everything off
    pub fn idle() -> Self {
        Self {
            fan: DeviceState::Off,
            ac: DeviceState::Off,
            heater: DeviceState::Off,
        }
    }

    pub fn mode(&self) -> HvacMode {
        if self.heater.is_on() {
            HvacMode::Heating
        } else if self.ac.is_on() {
            HvacMode::Cooling
        } else {
            HvacMode::Idle
        }
    }
}
