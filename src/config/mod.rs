//! Configuration module for QuantVision.
//!
//! Structured configuration loaded from environment variables (and a `.env`
//! file when present), organized by concern: storage paths, history windows,
//! booster hyperparameters and logging.

mod observability_config;
mod training_config;

pub use observability_config::ObservabilityEnvConfig;
pub use training_config::TrainingEnvConfig;

use crate::domain::market::{BarInterval, HistoryPeriod, HistoryRequest};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Resolves a configuration key to its raw value.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parses `key` when set, otherwise returns `default`.
pub(crate) fn parse_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        None => Ok(default),
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the trained artifact is written and loaded from
    pub model_path: PathBuf,
    /// Directory holding `<SYMBOL>.csv` daily bar files
    pub market_data_dir: PathBuf,
    pub training_request: HistoryRequest,
    pub serving_request: HistoryRequest,
    pub training: TrainingEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let interval: BarInterval = parse_or(lookup, "BAR_INTERVAL", BarInterval::Daily)?;
        let training_period: HistoryPeriod = parse_or(
            lookup,
            "TRAINING_PERIOD",
            HistoryRequest::training().period,
        )?;
        let serving_period: HistoryPeriod =
            parse_or(lookup, "SERVING_PERIOD", HistoryRequest::serving().period)?;

        let training = TrainingEnvConfig::from_lookup(lookup).context("Failed to load training config")?;
        let observability = ObservabilityEnvConfig::from_lookup(lookup)
            .context("Failed to load observability config")?;

        Ok(Self {
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models/model.json")),
            market_data_dir: lookup("MARKET_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/market")),
            training_request: HistoryRequest {
                period: training_period,
                interval,
            },
            serving_request: HistoryRequest {
                period: serving_period,
                interval,
            },
            training,
            observability,
        })
    }
}
