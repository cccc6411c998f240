use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::classifier::LogisticRegression;
use crate::encoder::FittedEncoder;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no trained model artifact at {0}")]
    NotFound(PathBuf),
    #[error("corrupt model artifact: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The persisted unit combining a trained classifier, its fitted encoder,
/// and the feature-column order. Created by training, read by every
/// prediction and evaluation call, overwritten wholesale on retraining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: LogisticRegression,
    pub encoder: FittedEncoder,
    pub columns: Vec<String>,
}

/// Persistence seam for the model bundle, injected into the services so
/// tests can use isolated temporary stores instead of a shared global file.
pub trait ModelStore: Send + Sync {
    /// Serializes the whole bundle, overwriting any prior artifact
    /// unconditionally. No backup, no lock.
    fn save(&self, bundle: &ModelBundle) -> Result<(), StoreError>;
    /// Reloads the bundle; `StoreError::NotFound` if no artifact exists,
    /// `StoreError::Corrupt` if deserialization fails.
    fn load(&self) -> Result<ModelBundle, StoreError>;
    fn exists(&self) -> bool;
}

/// Filesystem-backed store: one JSON artifact at a fixed path.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    path: PathBuf,
}

impl FsModelStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Default artifact location, overridable via `UNDERWRITER_MODEL_PATH`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("UNDERWRITER_MODEL_PATH") {
            return PathBuf::from(path);
        }
        PathBuf::from("models").join("loan_model.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelStore for FsModelStore {
    fn save(&self, bundle: &ModelBundle) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_vec(bundle)?;
        fs::write(&self.path, payload)?;
        info!(
            "saved model bundle ({} features) to {:?}",
            bundle.columns.len(),
            self.path
        );
        Ok(())
    }

    fn load(&self) -> Result<ModelBundle, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::NotFound(self.path.clone()));
        }
        let payload = fs::read(&self.path)?;
        let bundle = serde_json::from_slice(&payload)?;
        Ok(bundle)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::encoder::FeatureEncoder;

    fn sample_bundle() -> ModelBundle {
        let csv = "Gender,ApplicantIncome,Loan_Status\nMale,5000,Y\nFemale,2000,N\n";
        let mut dataset = Dataset::from_csv(csv.as_bytes()).unwrap();
        dataset.take_labels();
        let (encoder, matrix) = FeatureEncoder::fit(&dataset);
        let columns = encoder.feature_names.clone();
        let model = LogisticRegression {
            weights: vec![0.5; matrix.n_features()],
            intercept: -0.1,
        };
        ModelBundle {
            model,
            encoder,
            columns,
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path().join("bundle.json"));
        assert!(!store.exists());

        let bundle = sample_bundle();
        store.save(&bundle).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.model, bundle.model);
        assert_eq!(loaded.encoder, bundle.encoder);
        assert_eq!(loaded.columns, bundle.columns);
    }

    #[test]
    fn load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn load_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, b"not json at all").unwrap();
        let store = FsModelStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn save_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path().join("bundle.json"));

        let mut bundle = sample_bundle();
        store.save(&bundle).unwrap();
        bundle.model.intercept = 42.0;
        store.save(&bundle).unwrap();

        assert_eq!(store.load().unwrap().model.intercept, 42.0);
    }
}
