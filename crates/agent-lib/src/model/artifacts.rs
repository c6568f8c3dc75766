//! Persistence for the trained artifact pair
//!
//! The regressor and its feature scaler are always written and loaded as a
//! pair fit on the same data snapshot. Each file embeds a fingerprint of the
//! dataset it was fit on; a missing file, a parse failure, or a fingerprint
//! mismatch makes the whole pair unusable and the model falls back to
//! Untrained rather than loading half a state.

use super::forest::RegressionForest;
use crate::error::ControlError;
use crate::features::Scaler;
use crate::models::TrainingExample;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const MODEL_FILE: &str = "hvac_model.json";
const SCALER_FILE: &str = "scaler.json";

/// Metadata stamped into both halves of the pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// SHA-256 over the serialized training snapshot
    pub data_fingerprint: String,
    pub example_count: usize,
    pub trained_at: i64,
}

impl ArtifactMeta {
    pub fn for_snapshot(examples: &[TrainingExample]) -> Result<Self, ControlError> {
        Ok(Self {
            data_fingerprint: fingerprint(examples)?,
            example_count: examples.len(),
            trained_at: chrono::Utc::now().timestamp(),
        })
    }
}

/// Fingerprint of a dataset snapshot, used to tie the pair together
pub fn fingerprint(examples: &[TrainingExample]) -> Result<String, ControlError> {
    let bytes = serde_json::to_vec(examples)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    meta: ArtifactMeta,
    forest: RegressionForest,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScalerArtifact {
    meta: ArtifactMeta,
    scaler: Scaler,
}

/// A consistent, fully-loaded artifact pair
#[derive(Debug)]
pub struct ArtifactPair {
    pub scaler: Scaler,
    pub forest: RegressionForest,
    pub meta: ArtifactMeta,
}

/// Owns the artifact directory and the write/load discipline for the pair
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    model_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(SCALER_FILE)
    }

    /// Persist both halves of the pair.
    ///
    /// Each file is written to a temp sibling and renamed into place, so a
    /// reader never observes a half-written file; readers that race a save
    /// see the old pair or the new pair.
    pub fn save(
        &self,
        scaler: &Scaler,
        forest: &RegressionForest,
        meta: &ArtifactMeta,
    ) -> Result<(), ControlError> {
        fs::create_dir_all(&self.model_dir)?;

        let scaler_bytes = serde_json::to_vec_pretty(&ScalerArtifact {
            meta: meta.clone(),
            scaler: scaler.clone(),
        })?;
        let model_bytes = serde_json::to_vec_pretty(&ModelArtifact {
            meta: meta.clone(),
            forest: forest.clone(),
        })?;

        write_atomic(&self.scaler_path(), &scaler_bytes)?;
        write_atomic(&self.model_path(), &model_bytes)?;

        Ok(())
    }

    /// Load the pair, returning None for any state that is not a complete,
    /// mutually consistent pair. None means retrain, never a partial load.
    pub fn load(&self) -> Option<ArtifactPair> {
        let model = match read_artifact::<ModelArtifact>(&self.model_path()) {
            Some(m) => m,
            None => return None,
        };
        let scaler = match read_artifact::<ScalerArtifact>(&self.scaler_path()) {
            Some(s) => s,
            None => return None,
        };

        if model.meta.data_fingerprint != scaler.meta.data_fingerprint {
            warn!(
                model_fingerprint = %model.meta.data_fingerprint,
                scaler_fingerprint = %scaler.meta.data_fingerprint,
                "Artifact pair fingerprints disagree, treating as untrained"
            );
            return None;
        }

        Some(ArtifactPair {
            scaler: scaler.scaler,
            forest: model.forest,
            meta: model.meta,
        })
    }

    /// True if any artifact file exists on disk
    pub fn any_artifact_present(&self) -> bool {
        self.model_path().exists() || self.scaler_path().exists()
    }
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(_) => return None,
    };
    match serde_json::from_slice(&bytes) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable artifact, treating as untrained");
            None
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ControlError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeaturePipeline;
    use crate::model::forest::ForestParams;
    use tempfile::TempDir;

    fn snapshot() -> Vec<TrainingExample> {
        (0..5)
            .map(|i| TrainingExample {
                temperature: 20.0 + i as f64,
                humidity: 40.0 + i as f64,
                co2_level: 400 + i * 50,
                occupancy: (i % 2) as u8,
                desired_temperature: 21.0 + i as f64 * 0.5,
            })
            .collect()
    }

    fn fit_pair(examples: &[TrainingExample]) -> (Scaler, RegressionForest, ArtifactMeta) {
        let mut pipeline = FeaturePipeline::new();
        let (scaler, vectors) = pipeline.fit_transform(examples);
        let labels: Vec<f64> = examples.iter().map(|e| e.desired_temperature).collect();
        let forest = RegressionForest::fit(&vectors, &labels, ForestParams::default());
        let meta = ArtifactMeta::for_snapshot(examples).unwrap();
        (scaler, forest, meta)
    }

    #[test]
    fn test_save_then_load_round_trips_predictions() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let examples = snapshot();
        let (scaler, forest, meta) = fit_pair(&examples);

        store.save(&scaler, &forest, &meta).unwrap();
        let pair = store.load().expect("pair should load");

        assert_eq!(pair.meta, meta);
        for example in &examples {
            let input = [
                example.temperature,
                example.humidity,
                example.co2_level as f64,
                example.occupancy as f64,
            ];
            let before = forest.predict(&scaler.transform(&input));
            let after = pair.forest.predict(&pair.scaler.transform(&input));
            assert!((before - after).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_half_means_no_pair() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let examples = snapshot();
        let (scaler, forest, meta) = fit_pair(&examples);

        store.save(&scaler, &forest, &meta).unwrap();
        fs::remove_file(store.scaler_path()).unwrap();

        assert!(store.load().is_none());
        assert!(store.any_artifact_present());
    }

    #[test]
    fn test_corrupt_half_means_no_pair() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let examples = snapshot();
        let (scaler, forest, meta) = fit_pair(&examples);

        store.save(&scaler, &forest, &meta).unwrap();
        fs::write(store.model_path(), b"not json").unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_fingerprint_mismatch_means_no_pair() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let examples = snapshot();
        let (scaler, forest, meta) = fit_pair(&examples);
        store.save(&scaler, &forest, &meta).unwrap();

        // Rewrite only the model half from a different snapshot
        let other = &examples[..2];
        let (_, other_forest, other_meta) = fit_pair(other);
        let bytes = serde_json::to_vec(&ModelArtifact {
            meta: other_meta,
            forest: other_forest,
        })
        .unwrap();
        fs::write(store.model_path(), bytes).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content_not_identity() {
        let examples = snapshot();
        let again = snapshot();
        assert_eq!(
            fingerprint(&examples).unwrap(),
            fingerprint(&again).unwrap()
        );

        let mut changed = snapshot();
        changed[0].desired_temperature += 1.0;
        assert_ne!(
            fingerprint(&examples).unwrap(),
            fingerprint(&changed).unwrap()
        );
    }
}
