//! Core library for the adaptive HVAC agent
//!
//! This crate provides the core functionality for:
//! - Sensor acquisition (hardware or simulated)
//! - Feature extraction and scaling
//! - The trainable setpoint model and its persisted artifact pair
//! - Actuator decision logic and output sinks
//! - The orchestrating control loop
//! - Health checks and observability

pub mod actuator;
pub mod control;
pub mod error;
pub mod features;
pub mod health;
pub mod model;
pub mod models;
pub mod observability;
pub mod sensors;
pub mod store;

pub use control::{ControlConfig, ControlLoop, CycleOutcome, OverrideOutcome};
pub use error::ControlError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use model::{SetpointModel, TrainOutcome};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use store::PreferenceStore;
