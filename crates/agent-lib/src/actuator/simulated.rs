//! No-op actuator backend
//!
//! Logs every transition and remembers the last applied state so tests and
//! the dashboard can observe what would have been driven.

use super::ActuatorSink;
use crate::models::ActuatorState;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::RwLock;
use tracing::info;

/// Universal fallback sink
pub struct SimulatedSink {
    last_applied: RwLock<Option<ActuatorState>>,
}

impl SimulatedSink {
    pub fn new() -> Self {
        Self {
            last_applied: RwLock::new(None),
        }
    }

    /// The most recent state this sink accepted
    pub fn last_applied(&self) -> Option<ActuatorState> {
        self.last_applied.read().ok().and_then(|s| *s)
    }
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActuatorSink for SimulatedSink {
    async fn apply(&self, state: &ActuatorState) -> Result<()> {
        info!(
            mode = state.mode().as_str(),
            fan = %state.fan,
            ac = %state.ac,
            heater = %state.heater,
            "Simulated actuator dispatch"
        );
        if let Ok(mut last) = self.last_applied.write() {
            *last = Some(*state);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
