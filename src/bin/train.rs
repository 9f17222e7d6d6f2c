//! QuantVision trainer
//!
//! Builds the labeled dataset for one ticker from local daily bars, fits the
//! boosted classifier on the leading 80% of rows, evaluates on the rest and
//! writes the model artifact.
//!
//! # Usage
//! ```sh
//! cargo run --bin train -- --ticker SPY --data-dir data/market --output models/model.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use quantvision::application::ml::{ModelTrainer, train_ticker};
use quantvision::config::Config;
use quantvision::domain::market::{HistoryPeriod, HistoryRequest};
use quantvision::domain::ml::FeatureSchema;
use quantvision::infrastructure::observability::init_tracing;
use quantvision::infrastructure::{CsvMarketDataSource, ModelStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker to train on
    #[arg(long, default_value = "SPY")]
    ticker: String,

    /// Directory holding <TICKER>.csv daily bars (defaults to MARKET_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Where to write the model artifact (defaults to MODEL_PATH)
    #[arg(long)]
    output: Option<PathBuf>,

    /// History window, e.g. 10y, 6mo, max (defaults to TRAINING_PERIOD)
    #[arg(long)]
    period: Option<HistoryPeriod>,

    /// Maximum boosting rounds
    #[arg(long)]
    n_estimators: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    max_depth: Option<usize>,

    /// Rounds without test-segment improvement before stopping (0 disables)
    #[arg(long)]
    early_stopping_rounds: Option<usize>,

    /// Also write the labeled dataset to this CSV file
    #[arg(long)]
    export_dataset: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.observability)?;

    info!("QuantVision trainer {} starting", env!("CARGO_PKG_VERSION"));

    let mut params = config.training.booster.clone();
    if let Some(n) = args.n_estimators {
        params.n_estimators = n;
    }
    if let Some(lr) = args.learning_rate {
        params.learning_rate = lr;
    }
    if let Some(depth) = args.max_depth {
        params.max_depth = depth;
    }
    if let Some(rounds) = args.early_stopping_rounds {
        params.early_stopping_rounds = (rounds > 0).then_some(rounds);
    }
    params.validate().context("Invalid hyperparameters")?;

    let request = HistoryRequest {
        period: args.period.unwrap_or(config.training_request.period),
        ..config.training_request
    };
    let source = CsvMarketDataSource::new(args.data_dir.unwrap_or(config.market_data_dir));
    let ticker = args.ticker.to_uppercase();

    let (artifact, dataset) = train_ticker(
        &source,
        &ticker,
        &request,
        &FeatureSchema::standard(),
        &ModelTrainer::new(params),
    )
    .with_context(|| format!("Training failed for {}", ticker))?;

    if let Some(path) = args.export_dataset {
        dataset.write_csv(&path)?;
        info!("Exported {} dataset rows to {:?}", dataset.len(), path);
    }

    let store = ModelStore::new(args.output.unwrap_or(config.model_path));
    store.save(&artifact)?;

    println!("\n=== {} ({} rows) ===", ticker, dataset.len());
    if let Some(report) = artifact.evaluation() {
        println!("{}", report);
    }
    println!("Model {} saved to {:?}", artifact.id(), store.path());

    Ok(())
}
