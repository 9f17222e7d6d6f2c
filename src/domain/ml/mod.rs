// Labeled datasets and the direction label
pub mod dataset;

// Ordered, versioned feature schema
pub mod feature_registry;

// Prediction results and serving shapes
pub mod prediction;

pub use dataset::{Dataset, DatasetRow, Direction};
pub use feature_registry::{FeatureName, FeatureSchema, FeatureSource, FeatureVector};
pub use prediction::{Prediction, PredictionResponse, ServiceStatus, SupportingIndicators};
