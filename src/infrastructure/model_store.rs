use crate::application::ml::ModelArtifact;
use crate::domain::errors::ModelArtifactError;
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// JSON file store for the trained model artifact.
pub struct ModelStore {
    file_path: PathBuf,
}

impl ModelStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create model directory")?;
        }

        let content =
            serde_json::to_string_pretty(artifact).context("Failed to serialize model artifact")?;

        // Atomic write: write to temp file then rename
        let temp_path = self.file_path.with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp model file")?;
        fs::rename(&temp_path, &self.file_path).context("Failed to rename model file")?;

        info!(
            "Saved model {} ({}, {} trees) to {:?}",
            artifact.id(),
            artifact.ticker(),
            artifact.classifier().n_trees(),
            self.file_path
        );
        Ok(())
    }

    pub fn load(&self) -> Result<ModelArtifact, ModelArtifactError> {
        let content = fs::read_to_string(&self.file_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ModelArtifactError::Missing {
                path: self.file_path.clone(),
            },
            _ => ModelArtifactError::Io {
                path: self.file_path.clone(),
                source: e,
            },
        })?;

        let artifact: ModelArtifact =
            serde_json::from_str(&content).map_err(|e| ModelArtifactError::Corrupt {
                path: self.file_path.clone(),
                reason: e.to_string(),
            })?;
        artifact
            .validate()
            .map_err(|reason| ModelArtifactError::Corrupt {
                path: self.file_path.clone(),
                reason,
            })?;

        info!(
            "Loaded model {} for {} (schema v{}, {} features, trained {})",
            artifact.id(),
            artifact.ticker(),
            artifact.schema().version(),
            artifact.schema().len(),
            artifact.trained_at()
        );
        Ok(artifact)
    }

    /// Loads once into a shared read-only handle.
    pub fn load_shared(&self) -> Result<Arc<ModelArtifact>, ModelArtifactError> {
        self.load().map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::{BoosterParams, GradientBoostedClassifier};
    use crate::domain::ml::FeatureSchema;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("quantvision-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    fn artifact() -> ModelArtifact {
        let x: Vec<Vec<f64>> = (0..30)
            .map(|i| (0..8).map(|j| ((i * 7 + j * 3) % 11) as f64).collect())
            .collect();
        let y: Vec<f64> = x.iter().map(|r| if r[0] > 5.0 { 1.0 } else { 0.0 }).collect();
        let params = BoosterParams {
            n_estimators: 15,
            learning_rate: 0.3,
            gamma: 0.0,
            early_stopping_rounds: None,
            ..BoosterParams::default()
        };
        let (classifier, _) = GradientBoostedClassifier::fit(&params, &x, &y, None).unwrap();
        ModelArtifact::new("test", FeatureSchema::standard(), params, classifier, None).unwrap()
    }

    #[test]
    fn test_missing_file() {
        let store = ModelStore::new(temp_path("absent.json"));
        assert!(matches!(
            store.load(),
            Err(ModelArtifactError::Missing { .. })
        ));
    }

    #[test]
    fn test_save_load_is_identical() {
        let path = temp_path("model.json");
        let store = ModelStore::new(&path);
        let original = artifact();
        store.save(&original).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, original);
        assert!(!path.with_extension("tmp").exists());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let path = temp_path("model.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ModelStore::new(&path).load(),
            Err(ModelArtifactError::Corrupt { .. })
        ));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_width_mismatch_is_corrupt() {
        let path = temp_path("model.json");
        let store = ModelStore::new(&path);
        store.save(&artifact()).unwrap();

        // Drop a feature from the stored schema
        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["schema"]["features"].as_array_mut().unwrap().pop();
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        match store.load() {
            Err(ModelArtifactError::Corrupt { reason, .. }) => {
                assert!(reason.contains("expects 8 features"))
            }
            other => panic!("expected corrupt artifact, got {:?}", other.map(|a| a.id())),
        }
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
