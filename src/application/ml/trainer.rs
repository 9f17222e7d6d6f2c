use super::artifact::ModelArtifact;
use super::booster::{BoosterParams, EvalSet, GradientBoostedClassifier};
use super::dataset_builder::{MIN_HISTORY, build_dataset_with_schema};
use super::metrics::ClassificationReport;
use crate::domain::errors::{MarketDataError, TrainingError};
use crate::domain::market::HistoryRequest;
use crate::domain::ml::{Dataset, Direction, FeatureName, FeatureSchema};
use crate::domain::ports::MarketDataSource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Share of rows, from the start of the series, used for fitting.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_span: Option<(NaiveDate, NaiveDate)>,
    pub test_span: Option<(NaiveDate, NaiveDate)>,
    pub accuracy: f64,
    pub classification: ClassificationReport,
    pub rounds_run: usize,
    pub best_iteration: Option<usize>,
    pub n_trees: usize,
    pub eval_logloss: Vec<f64>,
    pub feature_importance: Vec<(FeatureName, f64)>,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Train rows: {}  Test rows: {}",
            self.train_rows, self.test_rows
        )?;
        if let (Some((a, b)), Some((c, d))) = (self.train_span, self.test_span) {
            writeln!(f, "Train span: {} .. {}  Test span: {} .. {}", a, b, c, d)?;
        }
        writeln!(
            f,
            "Trees kept: {} of {} rounds (best iteration: {})",
            self.n_trees,
            self.rounds_run,
            self.best_iteration
                .map_or_else(|| "n/a".to_string(), |i| i.to_string())
        )?;
        writeln!(f, "Accuracy: {:.2}%", self.accuracy * 100.0)?;
        writeln!(f)?;
        write!(f, "{}", self.classification)?;
        writeln!(f)?;
        writeln!(f, "Feature importance (gain):")?;
        let mut ranked = self.feature_importance.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (name, share) in ranked {
            writeln!(f, "  {:<12} {:>6.2}%", name.as_str(), share * 100.0)?;
        }
        Ok(())
    }
}

/// Chronological split, boosted fit with early stopping on the test segment,
/// and held-out evaluation.
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    params: BoosterParams,
    train_fraction: f64,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self::new(BoosterParams::default())
    }
}

impl ModelTrainer {
    pub fn new(params: BoosterParams) -> Self {
        Self {
            params,
            train_fraction: TRAIN_FRACTION,
        }
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    pub fn train(&self, dataset: &Dataset, ticker: &str) -> Result<ModelArtifact, TrainingError> {
        if dataset.is_empty() {
            return Err(TrainingError::EmptyDataset {
                ticker: ticker.to_string(),
                required: MIN_HISTORY,
            });
        }

        let (train, test) = dataset.chronological_split(self.train_fraction);
        if train.is_empty() || test.is_empty() {
            return Err(TrainingError::InsufficientRows {
                rows: dataset.len(),
                train: train.len(),
                test: test.len(),
            });
        }

        let x_train = train.features();
        let y_train = train.targets();
        let x_test = test.features();
        let y_test = test.targets();

        info!(
            "Training {} on {} rows, evaluating on {} rows",
            ticker,
            train.len(),
            test.len()
        );

        let (classifier, summary) = GradientBoostedClassifier::fit(
            &self.params,
            &x_train,
            &y_train,
            Some(EvalSet {
                x: &x_test,
                y: &y_test,
            }),
        )
        .map_err(|e| TrainingError::Fit {
            reason: e.to_string(),
        })?;

        let predicted = x_test
            .iter()
            .map(|row| classifier.predict_class(row).map(Direction::from_class))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TrainingError::Fit {
                reason: e.to_string(),
            })?;
        let classification = ClassificationReport::new(&test.labels(), &predicted);

        let feature_importance = dataset
            .schema()
            .features()
            .iter()
            .copied()
            .zip(classifier.feature_importance())
            .collect();

        let report = TrainingReport {
            train_rows: train.len(),
            test_rows: test.len(),
            train_span: train.date_span(),
            test_span: test.date_span(),
            accuracy: classification.accuracy,
            classification,
            rounds_run: summary.rounds_run,
            best_iteration: summary.best_iteration,
            n_trees: classifier.n_trees(),
            eval_logloss: summary.eval_logloss,
            feature_importance,
        };

        if report.accuracy < 0.5 {
            warn!(
                "{} model scores {:.2}% on the test segment, below chance",
                ticker,
                report.accuracy * 100.0
            );
        }
        info!(
            "Trained {}: accuracy {:.2}%, {} trees",
            ticker,
            report.accuracy * 100.0,
            report.n_trees
        );

        Ok(ModelArtifact::new(
            ticker,
            dataset.schema().clone(),
            self.params.clone(),
            classifier,
            Some(report),
        )?)
    }
}

/// Fetch, build and train in one call.
pub fn train_ticker<S: MarketDataSource + ?Sized>(
    source: &S,
    ticker: &str,
    request: &HistoryRequest,
    schema: &FeatureSchema,
    trainer: &ModelTrainer,
) -> anyhow::Result<(ModelArtifact, Dataset)> {
    let series = source.fetch_history(ticker, request)?;
    if series.is_empty() {
        return Err(MarketDataError::NotFound {
            symbol: ticker.to_string(),
        }
        .into());
    }
    info!(
        "Fetched {} bars for {} from {} ({})",
        series.len(),
        ticker,
        source.name(),
        request.period
    );

    let dataset = build_dataset_with_schema(&series, schema).map_err(TrainingError::from)?;
    let artifact = trainer.train(&dataset, ticker)?;
    Ok((artifact, dataset))
}
