use crate::domain::ml::dataset::Direction;
use crate::domain::ml::feature_registry::FeatureVector;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Indicator values at the predicted bar, reported for observability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportingIndicators {
    pub rsi: f64,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub bb_high: Option<f64>,
    pub bb_low: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub direction: Direction,
    /// Highest class probability, as a percentage in [50, 100]
    pub confidence: f64,
    pub probability_up: f64,
    pub current_price: f64,
    pub indicators: SupportingIndicators,
    pub features: FeatureVector,
}

impl Prediction {
    pub fn to_response(&self) -> PredictionResponse {
        PredictionResponse {
            ticker: self.ticker.to_uppercase(),
            prediction: self.direction,
            confidence: round2(self.confidence),
            current_price: round2(self.current_price),
            rsi: round2(self.indicators.rsi),
        }
    }
}

/// Wire shape returned to the serving layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub ticker: String,
    pub prediction: Direction,
    pub confidence: f64,
    pub current_price: f64,
    pub rsi: f64,
}

/// Error body for the serving layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub detail: String,
}

/// Health summary of a running prediction service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub engine: String,
    pub model_id: Uuid,
    pub model_ticker: String,
    pub schema_version: u32,
    pub trained_at: DateTime<Utc>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(73.456), 73.46);
        assert_eq!(round2(50.0), 50.0);
        assert_eq!(round2(-1.234), -1.23);
    }

    #[test]
    fn test_response_serialization() {
        let response = PredictionResponse {
            ticker: "AAPL".to_string(),
            prediction: Direction::Up,
            confidence: 61.27,
            current_price: 189.5,
            rsi: 55.01,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["prediction"], "UP");
        assert_eq!(json["confidence"], 61.27);
        assert_eq!(json["rsi"], 55.01);
    }
}
