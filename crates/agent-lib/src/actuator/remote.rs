//! Remote actuator backend
//!
//! Publishes the actuator state as JSON to an HTTP endpoint (smart-plug
//! bridge or building controller). Reachability is checked once at startup;
//! retry policy on dispatch belongs to the receiving side, not this sink.

use super::ActuatorSink;
use crate::models::ActuatorState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Actuator sink publishing to a remote HTTP endpoint
pub struct RemoteSink {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteSink {
    /// Build the sink and verify the endpoint is reachable
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        // Any response counts as reachable; only transport failures matter
        client
            .get(endpoint)
            .send()
            .await
            .context("Remote actuator endpoint did not respond")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl ActuatorSink for RemoteSink {
    async fn apply(&self, state: &ActuatorState) -> Result<()> {
        self.client
            .post(&self.endpoint)
            .json(state)
            .send()
            .await
            .context("Failed to publish actuator state")?
            .error_for_status()
            .context("Remote endpoint rejected actuator state")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
