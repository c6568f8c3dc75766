//! Durable, append-only log of user temperature preferences
//!
//! Backed by a headered CSV file with the columns
//! `temperature,humidity,co2_level,occupancy,desired_temperature`. Rows are
//! never mutated or deleted; a missing file simply means no preferences have
//! been recorded yet.

use crate::error::ControlError;
use crate::models::TrainingExample;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Append-only preference dataset on the local filesystem
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full historical dataset in insertion order.
    ///
    /// A missing file is the expected cold-start state and yields an empty
    /// vec. Rows with non-finite values are dropped rather than poisoning a
    /// later fit.
    pub fn load(&self) -> Result<Vec<TrainingExample>, ControlError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No preference dataset yet");
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut examples = Vec::new();
        let mut dropped = 0usize;

        for record in reader.deserialize() {
            let example: TrainingExample = record?;
            if example.is_valid() {
                examples.push(example);
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            warn!(dropped, "Dropped rows with non-finite values from dataset");
        }

        Ok(examples)
    }

    /// Durably append one example, creating the file (and its parent
    /// directory) with a header row on first use.
    pub fn append(&self, example: &TrainingExample) -> Result<(), ControlError> {
        let write_header = !self.path.exists();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(example)?;
        writer.flush()?;

        Ok(())
    }

    /// Number of stored examples
    pub fn len(&self) -> Result<usize, ControlError> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ControlError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn example(desired: f64) -> TrainingExample {
        TrainingExample {
            temperature: 24.0,
            humidity: 45.0,
            co2_level: 550,
            occupancy: 1,
            desired_temperature: desired,
        }
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.csv"));

        let examples = store.load().unwrap();
        assert!(examples.is_empty());
        // Loading must not create the file
        assert!(!store.path().exists());
    }

    #[test]
    fn test_append_creates_file_and_parent() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("data").join("prefs.csv"));

        store.append(&example(22.0)).unwrap();

        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), vec![example(22.0)]);
    }

    #[test]
    fn test_header_written_exactly_once() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.csv"));

        store.append(&example(21.0)).unwrap();
        store.append(&example(23.0)).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let headers = content
            .lines()
            .filter(|l| l.starts_with("temperature"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_load_preserves_insertion_order_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.csv"));

        store.append(&example(20.0)).unwrap();
        store.append(&example(24.0)).unwrap();
        store.append(&example(24.0)).unwrap();

        let examples = store.load().unwrap();
        assert_eq!(examples.len(), 3);
        assert_eq!(examples[0].desired_temperature, 20.0);
        assert_eq!(examples[1].desired_temperature, 24.0);
        assert_eq!(examples[2].desired_temperature, 24.0);
    }

    #[test]
    fn test_len_counts_rows() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.csv"));

        assert_eq!(store.len().unwrap(), 0);
        store.append(&example(22.0)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }
}
