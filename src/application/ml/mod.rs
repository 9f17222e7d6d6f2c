// Model artifact: classifier + schema + hyperparameters
pub mod artifact;

// Gradient-boosted trees
pub mod booster;
pub mod tree;

// Labeled dataset construction
pub mod dataset_builder;

// Evaluation
pub mod metrics;

// Serving
pub mod prediction_service;

// Chronological training
pub mod trainer;

pub use artifact::{Classification, ModelArtifact};
pub use booster::{BoosterError, BoosterParams, GradientBoostedClassifier};
pub use dataset_builder::{LABEL_HORIZON, MIN_HISTORY, build_dataset, build_dataset_with_schema};
pub use metrics::ClassificationReport;
pub use prediction_service::PredictionService;
pub use trainer::{ModelTrainer, TrainingReport, train_ticker};
