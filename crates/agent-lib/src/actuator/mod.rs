//! Actuator decision logic and output sinks
//!
//! `decide` is a pure function from the desired/current temperature pair to
//! an actuator state; it never looks at which sink is wired in. Sinks are
//! selected once at startup by probing, with the simulator as the universal
//! fallback, so the decision logic stays free of hardware conditionals.

mod gpio;
mod remote;
mod simulated;

pub use gpio::{GpioSink, AC_PIN, FAN_PIN, HEATER_PIN};
pub use remote::RemoteSink;
pub use simulated::SimulatedSink;

use crate::models::ActuatorState;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub use async_trait::async_trait;

/// Map the desired/current temperature gap onto an actuator state.
///
/// Three-way comparison with the tie at exact equality going to idle. There
/// is deliberately no deadband around the setpoint; see DESIGN.md for the
/// oscillation caveat.
pub fn decide(desired: f64, current: f64) -> ActuatorState {
    if current > desired {
        ActuatorState::cooling()
    } else if current < desired {
        ActuatorState::heating()
    } else {
        ActuatorState::idle()
    }
}

/// Trait for actuator output implementations
#[async_trait]
pub trait ActuatorSink: Send + Sync {
    /// Drive the actuators to the given state
    async fn apply(&self, state: &ActuatorState) -> Result<()>;

    /// Short backend identifier for logs
    fn name(&self) -> &'static str;
}

/// Probe available backends once at startup: GPIO pins if the sysfs root is
/// present, then a configured remote endpoint, then the simulator.
pub async fn create_sink(gpio_root: &Path, remote_endpoint: Option<&str>) -> Arc<dyn ActuatorSink> {
    if GpioSink::is_available(gpio_root).await {
        let sink = GpioSink::new(gpio_root);
        match sink.init().await {
            Ok(()) => {
                tracing::info!(root = %gpio_root.display(), "Driving actuators via GPIO");
                return Arc::new(sink);
            }
            Err(e) => {
                tracing::warn!(error = %e, "GPIO present but initialization failed");
            }
        }
    }

    if let Some(endpoint) = remote_endpoint {
        match RemoteSink::connect(endpoint).await {
            Ok(sink) => {
                tracing::info!(endpoint = %endpoint, "Publishing actuator state to remote endpoint");
                return Arc::new(sink);
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Remote endpoint unreachable");
            }
        }
    }

    tracing::warn!("No actuator hardware available, running in simulation mode");
    Arc::new(SimulatedSink::new())
}
