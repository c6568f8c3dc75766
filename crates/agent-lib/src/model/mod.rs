//! Adaptive setpoint prediction engine
//!
//! Wraps the regression forest behind the two-state contract the control
//! loop relies on: **Untrained** (no usable artifact pair) and **Trained**
//! (scaler + model fit on the same snapshot). Every retrain rebuilds both
//! artifacts from the complete preference history and swaps them in whole;
//! predictions racing a retrain observe the previous pair or the new one,
//! never a half-written state.

mod artifacts;
mod forest;

pub use artifacts::{fingerprint, ArtifactMeta, ArtifactPair, ArtifactStore};
pub use forest::{ForestParams, RegressionForest, DEFAULT_SEED, DEFAULT_TREES};

use crate::error::ControlError;
use crate::features::FeaturePipeline;
use crate::models::{SensorReading, TrainingExample};
use crate::store::PreferenceStore;
use std::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Result of a training attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    Trained { examples: usize },
    /// The dataset was empty; the model stays Untrained and the caller keeps
    /// running on the default setpoint
    NoData,
}

struct TrainedState {
    pipeline: FeaturePipeline,
    forest: RegressionForest,
    meta: ArtifactMeta,
}

/// The trainable setpoint predictor and owner of the persisted artifact pair
pub struct SetpointModel {
    store: PreferenceStore,
    artifacts: ArtifactStore,
    params: ForestParams,
    state: RwLock<Option<TrainedState>>,
    // Retrains hold this for their full duration; the artifact pair is a
    // single exclusive-write resource
    train_lock: Mutex<()>,
}

impl SetpointModel {
    pub fn new(store: PreferenceStore, artifacts: ArtifactStore) -> Self {
        Self::with_params(store, artifacts, ForestParams::default())
    }

    pub fn with_params(
        store: PreferenceStore,
        artifacts: ArtifactStore,
        params: ForestParams,
    ) -> Self {
        Self {
            store,
            artifacts,
            params,
            state: RwLock::new(None),
            train_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    /// Attempt to rehydrate the artifact pair from disk. Returns true when a
    /// consistent pair was loaded; an inconsistent pair is logged and left
    /// for the next retrain to overwrite.
    pub fn bootstrap(&self) -> Result<bool, ControlError> {
        match self.artifacts.load() {
            Some(pair) => {
                info!(
                    examples = pair.meta.example_count,
                    trained_at = pair.meta.trained_at,
                    "Loaded persisted artifact pair"
                );
                let mut state = self.write_state()?;
                *state = Some(TrainedState {
                    pipeline: FeaturePipeline::with_scaler(pair.scaler),
                    forest: pair.forest,
                    meta: pair.meta,
                });
                Ok(true)
            }
            None => {
                if self.artifacts.any_artifact_present() {
                    warn!("Inconsistent artifact pair on disk, will retrain from history");
                }
                Ok(false)
            }
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Metadata of the active pair, if any
    pub fn meta(&self) -> Option<ArtifactMeta> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|t| t.meta.clone()))
    }

    /// Retrain from the complete preference history.
    ///
    /// An empty dataset is a reported condition, not a failure: the model
    /// stays Untrained and no artifact files are created.
    pub fn train(&self) -> Result<TrainOutcome, ControlError> {
        let _guard = self
            .train_lock
            .lock()
            .map_err(|e| ControlError::Training(format!("train lock poisoned: {e}")))?;

        let examples = self.store.load()?;
        if examples.is_empty() {
            debug!(path = %self.store.path().display(), "No preference data, staying untrained");
            return Ok(TrainOutcome::NoData);
        }

        let mut pipeline = FeaturePipeline::new();
        let (scaler, vectors) = pipeline.fit_transform(&examples);
        let labels: Vec<f64> = examples.iter().map(|e| e.desired_temperature).collect();
        let forest = RegressionForest::fit(&vectors, &labels, self.params.clone());
        let meta = ArtifactMeta::for_snapshot(&examples)?;

        // Persist the new pair before exposing it to readers
        self.artifacts.save(&scaler, &forest, &meta)?;

        let mut state = self.write_state()?;
        *state = Some(TrainedState {
            pipeline,
            forest,
            meta,
        });

        info!(examples = examples.len(), "Setpoint model retrained");
        Ok(TrainOutcome::Trained {
            examples: examples.len(),
        })
    }

    /// Predict the desired temperature for a reading, rounded to 2 decimal
    /// places.
    ///
    /// An Untrained model first attempts a lazy `train()`; if that still
    /// yields no data the call fails with `NoModelAvailable` rather than
    /// fabricating a value.
    pub fn predict(&self, reading: &SensorReading) -> Result<f64, ControlError> {
        {
            let state = self.read_state()?;
            if let Some(trained) = state.as_ref() {
                return infer(trained, reading);
            }
        }

        match self.train()? {
            TrainOutcome::NoData => Err(ControlError::NoModelAvailable),
            TrainOutcome::Trained { .. } => {
                let state = self.read_state()?;
                let trained = state.as_ref().ok_or(ControlError::NoModelAvailable)?;
                infer(trained, reading)
            }
        }
    }

    /// Record a user override as a new training example and fully retrain
    /// from the complete history. Returns the new example count.
    pub fn incorporate_override(
        &self,
        reading: &SensorReading,
        user_temperature: f64,
    ) -> Result<usize, ControlError> {
        let example = TrainingExample::from_reading(reading, user_temperature);
        self.store.append(&example)?;

        match self.train()? {
            TrainOutcome::Trained { examples } => Ok(examples),
            // The append above makes the dataset non-empty
            TrainOutcome::NoData => Err(ControlError::NoModelAvailable),
        }
    }

    fn read_state(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, Option<TrainedState>>, ControlError> {
        self.state
            .read()
            .map_err(|e| ControlError::Training(format!("state lock poisoned: {e}")))
    }

    fn write_state(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, Option<TrainedState>>, ControlError> {
        self.state
            .write()
            .map_err(|e| ControlError::Training(format!("state lock poisoned: {e}")))
    }
}

fn infer(trained: &TrainedState, reading: &SensorReading) -> Result<f64, ControlError> {
    let features = FeaturePipeline::extract(reading);
    let scaled = trained.pipeline.transform(&features)?;
    Ok(round2(trained.forest.predict(&scaled)))
}

/// Output precision contract: downstream display and actuator comparisons
/// depend on 2-decimal rounding.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reading() -> SensorReading {
        SensorReading {
            temperature: 28.0,
            humidity: 40.0,
            co2_level: 500,
            occupancy: 1,
        }
    }

    fn model_in(dir: &TempDir) -> SetpointModel {
        let store = PreferenceStore::new(dir.path().join("data").join("prefs.csv"));
        let artifacts = ArtifactStore::new(dir.path().join("models"));
        SetpointModel::new(store, artifacts)
    }

    fn seed_examples(model: &SetpointModel, count: usize) {
        for i in 0..count {
            let example = TrainingExample {
                temperature: 18.0 + i as f64,
                humidity: 35.0 + i as f64 * 2.0,
                co2_level: 400 + i as u32 * 40,
                occupancy: (i % 2) as u8,
                desired_temperature: 20.0 + (i % 5) as f64,
            };
            model.store().append(&example).unwrap();
        }
    }

    #[test]
    fn test_cold_start_predict_fails_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let model = model_in(&dir);

        for _ in 0..2 {
            let result = model.predict(&reading());
            assert!(matches!(result, Err(ControlError::NoModelAvailable)));
        }
        assert!(!model.is_trained());
        assert!(!dir.path().join("models").join("hvac_model.json").exists());
        assert!(!dir.path().join("models").join("scaler.json").exists());
    }

    #[test]
    fn test_train_on_empty_dataset_reports_no_data() {
        let dir = TempDir::new().unwrap();
        let model = model_in(&dir);

        assert_eq!(model.train().unwrap(), TrainOutcome::NoData);
        assert!(!model.is_trained());
        assert!(!dir.path().join("models").exists());
    }

    #[test]
    fn test_train_persists_consistent_pair() {
        let dir = TempDir::new().unwrap();
        let model = model_in(&dir);
        seed_examples(&model, 8);

        let outcome = model.train().unwrap();
        assert_eq!(outcome, TrainOutcome::Trained { examples: 8 });
        assert!(model.is_trained());
        assert!(dir.path().join("models").join("hvac_model.json").exists());
        assert!(dir.path().join("models").join("scaler.json").exists());
        assert_eq!(model.meta().unwrap().example_count, 8);
    }

    #[test]
    fn test_predict_lazily_trains_and_rounds() {
        let dir = TempDir::new().unwrap();
        let model = model_in(&dir);
        seed_examples(&model, 10);

        assert!(!model.is_trained());
        let predicted = model.predict(&reading()).unwrap();
        assert!(model.is_trained());

        // 2-decimal output contract
        assert!(((predicted * 100.0).round() - predicted * 100.0).abs() < 1e-9);
        assert!((5.0..=40.0).contains(&predicted), "predicted {}", predicted);
    }

    #[test]
    fn test_override_appends_exactly_one_and_retrains() {
        let dir = TempDir::new().unwrap();
        let model = model_in(&dir);
        seed_examples(&model, 4);
        model.train().unwrap();
        let fingerprint_before = model.meta().unwrap().data_fingerprint;

        let count = model.incorporate_override(&reading(), 25.0).unwrap();

        assert_eq!(count, 5);
        assert_eq!(model.store().len().unwrap(), 5);
        // The retrain saw the new snapshot
        assert_ne!(model.meta().unwrap().data_fingerprint, fingerprint_before);
        assert_eq!(model.meta().unwrap().example_count, 5);
    }

    #[test]
    fn test_override_on_cold_store_trains_from_single_example() {
        let dir = TempDir::new().unwrap();
        let model = model_in(&dir);

        model.incorporate_override(&reading(), 23.5).unwrap();

        let predicted = model.predict(&reading()).unwrap();
        assert!((predicted - 23.5).abs() < 1e-9);
    }

    #[test]
    fn test_two_sequential_overrides_keep_both_examples() {
        let dir = TempDir::new().unwrap();
        let model = model_in(&dir);

        model.incorporate_override(&reading(), 20.0).unwrap();
        model.incorporate_override(&reading(), 24.0).unwrap();

        assert_eq!(model.store().len().unwrap(), 2);
        // The blended prediction need not equal either override, but it must
        // not fail
        let predicted = model.predict(&reading()).unwrap();
        assert!(predicted.is_finite());
    }

    #[test]
    fn test_bootstrap_restores_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let first = model_in(&dir);
        seed_examples(&first, 12);
        first.train().unwrap();
        let before = first.predict(&reading()).unwrap();

        let second = model_in(&dir);
        assert!(second.bootstrap().unwrap());
        assert!(second.is_trained());
        let after = second.predict(&reading()).unwrap();

        assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn test_inconsistent_pair_self_heals_by_retraining() {
        let dir = TempDir::new().unwrap();
        let first = model_in(&dir);
        seed_examples(&first, 6);
        first.train().unwrap();
        std::fs::remove_file(dir.path().join("models").join("scaler.json")).unwrap();

        let second = model_in(&dir);
        assert!(!second.bootstrap().unwrap());
        assert!(!second.is_trained());

        // Lazy train on predict rebuilds the pair from history
        let predicted = second.predict(&reading()).unwrap();
        assert!(predicted.is_finite());
        assert!(dir.path().join("models").join("scaler.json").exists());
    }

    #[test]
    fn test_retrain_is_deterministic_for_same_history() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let a = model_in(&dir_a);
        let b = model_in(&dir_b);
        seed_examples(&a, 9);
        seed_examples(&b, 9);

        a.train().unwrap();
        b.train().unwrap();

        assert_eq!(a.predict(&reading()).unwrap(), b.predict(&reading()).unwrap());
    }
}
