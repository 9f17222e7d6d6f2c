//! QuantVision predictor
//!
//! Loads the model artifact once and prints one JSON line per ticker: either
//! the prediction response or an error body carrying a status code.
//!
//! # Usage
//! ```sh
//! cargo run --bin predict -- AAPL MSFT
//! cargo run --bin predict -- --status
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use quantvision::application::ml::PredictionService;
use quantvision::config::Config;
use quantvision::domain::market::{HistoryPeriod, HistoryRequest};
use quantvision::infrastructure::observability::init_tracing;
use quantvision::infrastructure::{CsvMarketDataSource, ModelStore};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tickers to predict
    tickers: Vec<String>,

    /// Model artifact to load (defaults to MODEL_PATH)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory holding <TICKER>.csv daily bars (defaults to MARKET_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// History window fetched per request (defaults to SERVING_PERIOD)
    #[arg(long)]
    period: Option<HistoryPeriod>,

    /// Print the service status and exit
    #[arg(long)]
    status: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.observability)?;

    let store = ModelStore::new(args.model.unwrap_or(config.model_path));
    let model = match store.load_shared() {
        Ok(model) => model,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let request = HistoryRequest {
        period: args.period.unwrap_or(config.serving_request.period),
        ..config.serving_request
    };
    let source = CsvMarketDataSource::new(args.data_dir.unwrap_or(config.market_data_dir));
    let service = PredictionService::new(model, source).with_request(request);

    if args.status || args.tickers.is_empty() {
        println!("{}", serde_json::to_string(&service.status())?);
        return Ok(());
    }

    info!("Predicting {} ticker(s)", args.tickers.len());
    for ticker in &args.tickers {
        let line = match service.respond(ticker) {
            Ok(response) => serde_json::to_string(&response)?,
            Err(body) => serde_json::to_string(&body)?,
        };
        println!("{}", line);
    }

    Ok(())
}
