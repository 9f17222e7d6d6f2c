use crate::domain::ml::feature_registry::FeatureName;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by market-data collaborators
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("No market data found for {symbol}")]
    NotFound { symbol: String },

    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("Unsupported history request: {reason}")]
    UnsupportedRequest { reason: String },

    #[error("Failed to read market data for {symbol}: {source}")]
    Io {
        symbol: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a series cannot produce a complete feature vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryShortfall {
    TooFewBars { available: usize, required: usize },
    UndefinedFeature { feature: FeatureName },
}

impl fmt::Display for HistoryShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryShortfall::TooFewBars {
                available,
                required,
            } => write!(f, "{} bars available, {} required", available, required),
            HistoryShortfall::UndefinedFeature { feature } => {
                write!(f, "feature {} is still warming up", feature)
            }
        }
    }
}

/// Errors surfaced by the prediction service to its caller
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Ticker not found: {ticker}")]
    DataUnavailable { ticker: String },

    #[error(
        "Insufficient history for {ticker}: {shortfall}. Retry with a longer history or a more liquid instrument"
    )]
    InsufficientHistory {
        ticker: String,
        shortfall: HistoryShortfall,
    },

    #[error("Inference failed for {ticker}: {reason}")]
    Inference { ticker: String, reason: String },
}

impl PredictionError {
    /// Status code a serving layer should attach to this error
    pub fn status_code(&self) -> u16 {
        match self {
            PredictionError::DataUnavailable { .. } => 404,
            PredictionError::InsufficientHistory { .. } => 422,
            PredictionError::Inference { .. } => 500,
        }
    }

    /// Whether the same request may succeed with different input
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

/// Errors loading or persisting the model artifact
#[derive(Debug, Error)]
pub enum ModelArtifactError {
    #[error("Model artifact not found at {path:?}. Run the training entry point first")]
    Missing { path: PathBuf },

    #[error("Model artifact at {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Model artifact I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to the feature schema
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Feature schema is empty")]
    Empty,

    #[error("Feature {feature} appears more than once in the schema")]
    DuplicateFeature { feature: FeatureName },

    #[error("Classifier expects {expected} features but schema declares {found}")]
    WidthMismatch { expected: usize, found: usize },
}

/// Invalid indicator parameters. Short input is never an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("{indicator} window must be > 0, got {window}")]
    InvalidWindow {
        indicator: &'static str,
        window: usize,
    },

    #[error("MACD fast period {fast} must be shorter than slow period {slow}")]
    InvalidMacdPeriods { fast: usize, slow: usize },
}

/// Errors raised while training a model
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Dataset for {ticker} is empty; need at least {required} bars of history")]
    EmptyDataset { ticker: String, required: usize },

    #[error("Dataset has {rows} rows; chronological split leaves {train} train and {test} test rows")]
    InsufficientRows {
        rows: usize,
        train: usize,
        test: usize,
    },

    #[error("Classifier fit failed: {reason}")]
    Fit { reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),
}
