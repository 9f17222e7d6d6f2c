use super::artifact::ModelArtifact;
use super::dataset_builder::MIN_HISTORY;
use crate::application::indicators::IndicatorFrame;
use crate::domain::errors::{HistoryShortfall, MarketDataError, PredictionError};
use crate::domain::market::{HistoryRequest, TimeSeries};
use crate::domain::ml::prediction::ErrorResponse;
use crate::domain::ml::{Prediction, PredictionResponse, ServiceStatus, SupportingIndicators};
use crate::domain::ports::MarketDataSource;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ENGINE_NAME: &str = "XGBoost-v2-High-Precision";

/// Serves directional predictions from a loaded, read-only model artifact.
pub struct PredictionService<S: MarketDataSource> {
    model: Arc<ModelArtifact>,
    source: S,
    request: HistoryRequest,
}

impl<S: MarketDataSource> PredictionService<S> {
    pub fn new(model: Arc<ModelArtifact>, source: S) -> Self {
        Self {
            model,
            source,
            request: HistoryRequest::serving(),
        }
    }

    pub fn with_request(mut self, request: HistoryRequest) -> Self {
        self.request = request;
        self
    }

    pub fn model(&self) -> &Arc<ModelArtifact> {
        &self.model
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            status: "online",
            engine: ENGINE_NAME.to_string(),
            model_id: self.model.id(),
            model_ticker: self.model.ticker().to_string(),
            schema_version: self.model.schema().version(),
            trained_at: self.model.trained_at(),
        }
    }

    pub fn predict(&self, ticker: &str) -> Result<Prediction, PredictionError> {
        let series = match self.source.fetch_history(ticker, &self.request) {
            Ok(series) => series,
            Err(MarketDataError::NotFound { .. }) => {
                return Err(PredictionError::DataUnavailable {
                    ticker: ticker.to_string(),
                });
            }
            Err(e) => {
                warn!("Market data fetch failed for {}: {}", ticker, e);
                return Err(PredictionError::DataUnavailable {
                    ticker: ticker.to_string(),
                });
            }
        };
        self.predict_series(ticker, &series)
    }

    /// Runs the serving pipeline on an already fetched series.
    pub fn predict_series(
        &self,
        ticker: &str,
        series: &TimeSeries,
    ) -> Result<Prediction, PredictionError> {
        if series.is_empty() {
            return Err(PredictionError::DataUnavailable {
                ticker: ticker.to_string(),
            });
        }
        if series.len() < MIN_HISTORY {
            return Err(PredictionError::InsufficientHistory {
                ticker: ticker.to_string(),
                shortfall: HistoryShortfall::TooFewBars {
                    available: series.len(),
                    required: MIN_HISTORY,
                },
            });
        }

        let frame = IndicatorFrame::compute(series).map_err(|e| PredictionError::Inference {
            ticker: ticker.to_string(),
            reason: e.to_string(),
        })?;
        let Some(last) = frame.last_index() else {
            return Err(PredictionError::DataUnavailable {
                ticker: ticker.to_string(),
            });
        };

        let features = self.model.feature_vector_at(&frame, last).map_err(|undefined| {
            PredictionError::InsufficientHistory {
                ticker: ticker.to_string(),
                shortfall: HistoryShortfall::UndefinedFeature {
                    feature: undefined.0,
                },
            }
        })?;

        let result = self
            .model
            .classify(&features)
            .map_err(|e| PredictionError::Inference {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            })?;

        let prediction = Prediction {
            ticker: ticker.to_uppercase(),
            as_of: frame.dates[last],
            direction: result.direction,
            confidence: result.confidence(),
            probability_up: result.probability_up(),
            current_price: frame.close[last],
            indicators: SupportingIndicators {
                rsi: frame.rsi[last].unwrap_or(f64::NAN),
                macd: frame.macd[last],
                macd_signal: frame.macd_signal[last],
                sma_50: frame.sma_50[last],
                sma_200: frame.sma_200[last],
                bb_high: frame.bb_high[last],
                bb_low: frame.bb_low[last],
            },
            features,
        };

        debug!(
            "{} {} @ {:.2}: {} ({:.2}%)",
            prediction.ticker,
            prediction.as_of,
            prediction.current_price,
            prediction.direction,
            prediction.confidence
        );
        Ok(prediction)
    }

    /// Serving contract: rounded response or an error body with a status code.
    pub fn respond(&self, ticker: &str) -> Result<PredictionResponse, ErrorResponse> {
        self.predict(ticker)
            .map(|p| p.to_response())
            .map_err(|e| {
                if e.is_client_error() {
                    info!("Prediction rejected: {}", e);
                } else {
                    warn!("Prediction failed: {}", e);
                }
                ErrorResponse {
                    status: e.status_code(),
                    detail: e.to_string(),
                }
            })
    }

    /// Predicts many tickers in parallel against the shared artifact.
    pub fn predict_many(&self, tickers: &[String]) -> Vec<(String, Result<Prediction, PredictionError>)> {
        tickers
            .par_iter()
            .map(|t| (t.clone(), self.predict(t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::booster::BoosterParams;
    use crate::application::ml::dataset_builder::build_dataset;
    use crate::application::ml::trainer::ModelTrainer;
    use crate::domain::ml::FeatureName;
    use crate::infrastructure::mock::{InMemoryMarketDataSource, linear_series, sine_series};

    fn trained_model() -> Arc<ModelArtifact> {
        let dataset = build_dataset(&sine_series("OSC", 400, 100.0, 6.0, 21.0)).unwrap();
        let params = BoosterParams {
            n_estimators: 40,
            learning_rate: 0.1,
            early_stopping_rounds: None,
            ..BoosterParams::default()
        };
        Arc::new(ModelTrainer::new(params).train(&dataset, "OSC").unwrap())
    }

    #[test]
    fn test_unknown_ticker_is_data_unavailable() {
        let source = InMemoryMarketDataSource::new();
        let service = PredictionService::new(trained_model(), source);
        let err = service.predict("ZZZZ").unwrap_err();
        assert!(matches!(err, PredictionError::DataUnavailable { .. }));
        assert_eq!(service.respond("ZZZZ").unwrap_err().status, 404);
    }

    #[test]
    fn test_short_history_is_insufficient() {
        let source =
            InMemoryMarketDataSource::new().with_series(linear_series("NEW", 150, 20.0, 0.1));
        let service = PredictionService::new(trained_model(), source);
        match service.predict("NEW").unwrap_err() {
            PredictionError::InsufficientHistory { shortfall, .. } => assert_eq!(
                shortfall,
                HistoryShortfall::TooFewBars {
                    available: 150,
                    required: 205
                }
            ),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(service.respond("NEW").unwrap_err().status, 422);
    }

    #[test]
    fn test_prediction_uses_last_bar() {
        let series = sine_series("osc", 300, 100.0, 6.0, 21.0);
        let last_close = series.last().unwrap().close;
        let source = InMemoryMarketDataSource::new().with_series(series);
        let model = trained_model();
        let service = PredictionService::new(model.clone(), source);

        let prediction = service.predict("osc").unwrap();
        assert_eq!(prediction.ticker, "OSC");
        assert_eq!(prediction.current_price, last_close);
        assert_eq!(prediction.features.names(), model.schema().features());
        assert_eq!(prediction.features.get(FeatureName::Close), Some(last_close));
        assert!(prediction.confidence >= 50.0 && prediction.confidence <= 100.0);

        let response = service.respond("osc").unwrap();
        assert_eq!(response.ticker, "OSC");
        assert_eq!(response.current_price, (last_close * 100.0).round() / 100.0);
    }

    #[test]
    fn test_predict_many_shares_model() {
        let source = InMemoryMarketDataSource::new()
            .with_series(sine_series("A", 260, 50.0, 2.0, 15.0))
            .with_series(linear_series("B", 100, 10.0, 0.1));
        let service = PredictionService::new(trained_model(), source);

        let results = service.predict_many(&["A".to_string(), "B".to_string(), "C".to_string()]);
        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].1.as_ref().unwrap_err().status_code(), 422);
        assert_eq!(results[2].1.as_ref().unwrap_err().status_code(), 404);
        assert_eq!(service.source().calls(), 3);
    }

    #[test]
    fn test_status() {
        let model = trained_model();
        let service = PredictionService::new(model.clone(), InMemoryMarketDataSource::new());
        let status = service.status();
        assert_eq!(status.status, "online");
        assert_eq!(status.engine, ENGINE_NAME);
        assert_eq!(status.model_id, model.id());
        assert_eq!(status.schema_version, 1);
    }
}
