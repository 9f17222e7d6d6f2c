use super::booster::{BoosterError, BoosterParams, GradientBoostedClassifier};
use super::trainer::TrainingReport;
use crate::application::indicators::IndicatorFrame;
use crate::domain::errors::SchemaError;
use crate::domain::ml::feature_registry::UndefinedFeature;
use crate::domain::ml::{Direction, FeatureSchema, FeatureVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classifier output for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub direction: Direction,
    /// `[P(Down), P(Up)]`
    pub probabilities: [f64; 2],
}

impl Classification {
    /// Highest class probability as a percentage.
    pub fn confidence(&self) -> f64 {
        self.probabilities[0].max(self.probabilities[1]) * 100.0
    }

    pub fn probability_up(&self) -> f64 {
        self.probabilities[1]
    }
}

/// Trained classifier bundled with the exact schema and hyperparameters it was fit with.
///
/// The artifact is immutable once built. Serving extracts features only through
/// [`ModelArtifact::feature_vector_at`], which applies the stored schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    id: Uuid,
    ticker: String,
    trained_at: DateTime<Utc>,
    schema: FeatureSchema,
    hyperparameters: BoosterParams,
    classifier: GradientBoostedClassifier,
    evaluation: Option<TrainingReport>,
}

impl ModelArtifact {
    pub fn new(
        ticker: impl Into<String>,
        schema: FeatureSchema,
        hyperparameters: BoosterParams,
        classifier: GradientBoostedClassifier,
        evaluation: Option<TrainingReport>,
    ) -> Result<Self, SchemaError> {
        let artifact = Self {
            id: Uuid::new_v4(),
            ticker: ticker.into().to_uppercase(),
            trained_at: Utc::now(),
            schema,
            hyperparameters,
            classifier,
            evaluation,
        };
        artifact.check_width()?;
        Ok(artifact)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn hyperparameters(&self) -> &BoosterParams {
        &self.hyperparameters
    }

    pub fn classifier(&self) -> &GradientBoostedClassifier {
        &self.classifier
    }

    pub fn evaluation(&self) -> Option<&TrainingReport> {
        self.evaluation.as_ref()
    }

    /// Feature vector at bar `index`, in this artifact's schema order.
    pub fn feature_vector_at(
        &self,
        frame: &IndicatorFrame,
        index: usize,
    ) -> Result<FeatureVector, UndefinedFeature> {
        self.schema.extract(frame, index)
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Classification, BoosterError> {
        if features.names() != self.schema.features() {
            return Err(BoosterError::ShapeMismatch {
                expected: self.schema.len(),
                found: features.len(),
            });
        }
        let probabilities = self.classifier.predict_proba(&features.values())?;
        Ok(Classification {
            direction: Direction::from_class(usize::from(probabilities[1] > 0.5)),
            probabilities,
        })
    }

    /// Integrity checks for an artifact read back from storage.
    pub fn validate(&self) -> Result<(), String> {
        self.schema.validate().map_err(|e| e.to_string())?;
        self.check_width().map_err(|e| e.to_string())?;
        self.classifier.validate()
    }

    fn check_width(&self) -> Result<(), SchemaError> {
        if self.classifier.n_features() != self.schema.len() {
            return Err(SchemaError::WidthMismatch {
                expected: self.classifier.n_features(),
                found: self.schema.len(),
            });
        }
        Ok(())
    }
}
