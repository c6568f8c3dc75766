//! Agent configuration

use anyhow::Result;
use serde::Deserialize;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name of the conditioned zone this agent controls
    #[serde(default = "default_zone_name")]
    pub zone_name: String,

    /// Port for the control surface and health/metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Preference dataset file
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Directory holding the model and scaler artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    /// Control cycle interval in seconds
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,

    /// Setpoint used while no trained model is available
    #[serde(default = "default_setpoint")]
    pub default_setpoint: f64,

    /// sysfs GPIO root for the actuator relays
    #[serde(default = "default_gpio_root")]
    pub gpio_root: String,

    /// IIO device directory for the hardware sensors
    #[serde(default = "default_sensor_root")]
    pub sensor_root: String,

    /// Optional HTTP endpoint receiving actuator state
    #[serde(default)]
    pub remote_endpoint: Option<String>,
}

fn default_zone_name() -> String {
    std::env::var("HVAC_ZONE").unwrap_or_else(|_| "default-zone".to_string())
}

fn default_api_port() -> u16 {
    5000
}

fn default_data_path() -> String {
    "data/hvac_data.csv".to_string()
}

fn default_model_dir() -> String {
    "models".to_string()
}

fn default_cycle_interval() -> u64 {
    30
}

fn default_setpoint() -> f64 {
    22.0
}

fn default_gpio_root() -> String {
    "/sys/class/gpio".to_string()
}

fn default_sensor_root() -> String {
    "/sys/bus/iio/devices/iio:device0".to_string()
}

impl AgentConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("HVAC"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| AgentConfig {
            zone_name: default_zone_name(),
            api_port: default_api_port(),
            data_path: default_data_path(),
            model_dir: default_model_dir(),
            cycle_interval_secs: default_cycle_interval(),
            default_setpoint: default_setpoint(),
            gpio_root: default_gpio_root(),
            sensor_root: default_sensor_root(),
            remote_endpoint: None,
        }))
    }
}
