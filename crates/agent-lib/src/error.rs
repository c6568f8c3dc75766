//! Failure taxonomy for the setpoint predictor and control loop

use thiserror::Error;

/// Errors surfaced by the core components.
///
/// `DataUnavailable` and `ScalerNotFit` are recoverable by (re)training;
/// `NoModelAvailable` propagates to the caller of `predict` because there is
/// no safe value to fabricate.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The preference dataset is missing or empty at train time
    #[error("no training data available")]
    DataUnavailable,

    /// `transform` was invoked before any `fit_transform`
    #[error("feature scaler has not been fit")]
    ScalerNotFit,

    /// Training ran but could not produce a model
    #[error("no trained model available")]
    NoModelAvailable,

    /// The sensor collaborator failed to produce a reading
    #[error("sensor read failed: {0}")]
    SensorRead(String),

    /// The actuator sink rejected a dispatch; the computed state is still the
    /// intended decision
    #[error("actuator dispatch failed: {0}")]
    ActuatorDispatch(String),

    /// A retrain task failed to run to completion
    #[error("model training failed: {0}")]
    Training(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Preference dataset could not be read or written
    #[error("preference dataset error: {0}")]
    Dataset(#[from] csv::Error),

    /// Artifact pair could not be serialized or deserialized
    #[error("artifact serialization error: {0}")]
    Artifact(#[from] serde_json::Error),
}
