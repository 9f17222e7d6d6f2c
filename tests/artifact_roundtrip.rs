use quantvision::application::ml::{BoosterParams, ModelTrainer, PredictionService, build_dataset};
use quantvision::domain::errors::ModelArtifactError;
use quantvision::domain::market::{HistoryPeriod, HistoryRequest};
use quantvision::infrastructure::ModelStore;
use quantvision::infrastructure::mock::{InMemoryMarketDataSource, sine_series};
use std::path::PathBuf;
use std::sync::Arc;

fn temp_model_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("quantvision-it-{}", uuid::Uuid::new_v4()))
        .join("model.json")
}

#[test]
fn test_saved_model_predicts_identically() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let series = sine_series("OSC", 500, 100.0, 7.0, 27.0);
    let dataset = build_dataset(&series).unwrap();
    let trainer = ModelTrainer::new(BoosterParams {
        n_estimators: 150,
        learning_rate: 0.05,
        early_stopping_rounds: Some(25),
        ..BoosterParams::default()
    });
    let original = trainer.train(&dataset, "OSC").unwrap();

    let path = temp_model_path();
    let store = ModelStore::new(&path);
    store.save(&original).unwrap();
    let loaded = store.load_shared().unwrap();

    assert_eq!(loaded.id(), original.id());
    assert_eq!(loaded.schema(), original.schema());
    assert_eq!(loaded.hyperparameters(), original.hyperparameters());
    assert_eq!(loaded.classifier(), original.classifier());

    for row in dataset.rows() {
        let a = original.classifier().predict_proba(&row.features).unwrap();
        let b = loaded.classifier().predict_proba(&row.features).unwrap();
        assert_eq!(a, b);
    }

    let request = HistoryRequest {
        period: HistoryPeriod::Max,
        ..HistoryRequest::serving()
    };
    let before = PredictionService::new(
        Arc::new(original),
        InMemoryMarketDataSource::new().with_series(series.clone()),
    )
    .with_request(request)
    .predict("OSC")
    .unwrap();
    let after = PredictionService::new(loaded, InMemoryMarketDataSource::new().with_series(series))
        .with_request(request)
        .predict("OSC")
        .unwrap();
    assert_eq!(before, after);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_missing_artifact_is_fatal_error() {
    let store = ModelStore::new(temp_model_path());
    let err = store.load_shared().unwrap_err();
    assert!(matches!(err, ModelArtifactError::Missing { .. }));
    assert!(err.to_string().contains("training"));
}
