//! Feature extraction and scaling for the setpoint model
//!
//! Projects a sensor reading onto a fixed-order feature vector and owns the
//! standardizing transform fit on the preference dataset. The feature order
//! is an invariant shared with the regressor: scaler and model are both fit
//! on `[temperature, humidity, co2_level, occupancy]` and must agree.

use crate::error::ControlError;
use crate::models::{SensorReading, TrainingExample};
use serde::{Deserialize, Serialize};

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = 4;

/// Ordered feature vector: `[temperature, humidity, co2_level, occupancy]`
pub type FeatureVector = [f64; NUM_FEATURES];

/// Fitted standardization parameters, persisted alongside the model.
///
/// A scaler is only ever fit on the same feature order it later transforms;
/// it is refit from scratch whenever the dataset changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    means: [f64; NUM_FEATURES],
    scales: [f64; NUM_FEATURES],
}

impl Scaler {
    /// Fit per-feature mean and population standard deviation on a batch.
    ///
    /// Zero-variance features keep a unit scale so transforming them is the
    /// identity around the mean.
    pub fn fit(vectors: &[FeatureVector]) -> Self {
        let n = vectors.len().max(1) as f64;
        let mut means = [0.0; NUM_FEATURES];
        let mut scales = [1.0; NUM_FEATURES];

        for feature in 0..NUM_FEATURES {
            let sum: f64 = vectors.iter().map(|v| v[feature]).sum();
            means[feature] = sum / n;
        }
        for feature in 0..NUM_FEATURES {
            let sum_sq: f64 = vectors
                .iter()
                .map(|v| (v[feature] - means[feature]).powi(2))
                .sum();
            let std = (sum_sq / n).sqrt();
            if std > f64::EPSILON {
                scales[feature] = std;
            }
        }

        Self { means, scales }
    }

    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; NUM_FEATURES];
        for feature in 0..NUM_FEATURES {
            out[feature] = (features[feature] - self.means[feature]) / self.scales[feature];
        }
        out
    }
}

/// Stateful pipeline wrapping the extraction projection and an optional
/// fitted scaler.
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    scaler: Option<Scaler>,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self { scaler: None }
    }

    /// Rehydrate a pipeline from a previously persisted scaler
    pub fn with_scaler(scaler: Scaler) -> Self {
        Self {
            scaler: Some(scaler),
        }
    }

    /// Pure, order-preserving projection of a reading onto the feature space
    pub fn extract(reading: &SensorReading) -> FeatureVector {
        [
            reading.temperature,
            reading.humidity,
            reading.co2_level as f64,
            reading.occupancy as f64,
        ]
    }

    /// Fit the scaler on a batch of examples and return the fitted state
    /// together with the transformed vectors. Persistence of the returned
    /// state is the caller's responsibility.
    pub fn fit_transform(
        &mut self,
        examples: &[TrainingExample],
    ) -> (Scaler, Vec<FeatureVector>) {
        let raw: Vec<FeatureVector> = examples
            .iter()
            .map(|e| {
                [
                    e.temperature,
                    e.humidity,
                    e.co2_level as f64,
                    e.occupancy as f64,
                ]
            })
            .collect();

        let scaler = Scaler::fit(&raw);
        let transformed = raw.iter().map(|v| scaler.transform(v)).collect();
        self.scaler = Some(scaler.clone());
        (scaler, transformed)
    }

    /// Apply the previously fit transform without refitting
    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, ControlError> {
        let scaler = self.scaler.as_ref().ok_or(ControlError::ScalerNotFit)?;
        Ok(scaler.transform(features))
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        self.scaler.as_ref()
    }
}
