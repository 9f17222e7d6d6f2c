use crate::domain::errors::MarketDataError;
use crate::domain::market::{Bar, HistoryRequest, TimeSeries};
use crate::domain::ports::MarketDataSource;
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One CSV record. Accepts lower-case headers and Yahoo-style `Date,Open,...,Adj Close,Volume`.
#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(alias = "Date", alias = "timestamp")]
    date: String,
    #[serde(alias = "Open")]
    open: Option<f64>,
    #[serde(alias = "High")]
    high: Option<f64>,
    #[serde(alias = "Low")]
    low: Option<f64>,
    #[serde(alias = "Close")]
    close: Option<f64>,
    #[serde(alias = "Adj Close", default)]
    adj_close: Option<f64>,
    #[serde(alias = "Volume", default)]
    volume: Option<f64>,
}

impl CsvBar {
    /// With `adjusted`, an `Adj Close` value replaces the close and rescales
    /// open/high/low by the same factor.
    fn into_bar(self, adjusted: bool) -> Option<Bar> {
        // Accept bare dates or timestamps with a time part
        let date = NaiveDate::parse_from_str(self.date.get(..10)?, "%Y-%m-%d").ok()?;
        let close = self.close?;
        let (factor, close) = match self.adj_close {
            Some(adj) if adjusted && close != 0.0 => (adj / close, adj),
            _ => (1.0, close),
        };
        Some(Bar {
            date,
            open: self.open? * factor,
            high: self.high? * factor,
            low: self.low? * factor,
            close,
            volume: self.volume.unwrap_or(0.0),
        })
    }
}

/// Reads daily bars from `<dir>/<SYMBOL>.csv`.
///
/// Files carrying an `Adj Close` column are read as split/dividend adjusted
/// bars by default; `with_adjusted(false)` keeps the raw prices.
pub struct CsvMarketDataSource {
    dir: PathBuf,
    adjusted: bool,
}

impl CsvMarketDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            adjusted: true,
        }
    }

    pub fn with_adjusted(mut self, adjusted: bool) -> Self {
        self.adjusted = adjusted;
        self
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }

    fn read_bars(&self, symbol: &str, path: &Path) -> Result<Vec<Bar>, MarketDataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(|e| csv_error(symbol, e))?;

        let mut bars = Vec::new();
        let mut dropped = 0usize;
        for record in reader.deserialize::<CsvBar>() {
            match record {
                Ok(raw) => match raw.into_bar(self.adjusted) {
                    Some(bar) if bar.is_valid(symbol) => bars.push(bar),
                    _ => dropped += 1,
                },
                Err(e) if e.is_io_error() => return Err(csv_error(symbol, e)),
                Err(e) => {
                    debug!("Skipping unreadable row for {}: {}", symbol, e);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!("Dropped {} incomplete rows from {:?}", dropped, path);
        }
        Ok(bars)
    }
}

impl MarketDataSource for CsvMarketDataSource {
    fn fetch_history(
        &self,
        symbol: &str,
        request: &HistoryRequest,
    ) -> Result<TimeSeries, MarketDataError> {
        let path = self.path_for(symbol);
        let bars = self.read_bars(symbol, &path)?;
        let series = TimeSeries::from_unsorted(symbol.to_uppercase(), bars);

        let trimmed = match series
            .last()
            .and_then(|last| request.period.cutoff(last.date))
        {
            Some(cutoff) => series.since(cutoff),
            None => series,
        };
        debug!(
            "Loaded {} bars for {} from {:?} ({})",
            trimmed.len(),
            symbol,
            path,
            request.period
        );
        Ok(trimmed)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

fn csv_error(symbol: &str, error: csv::Error) -> MarketDataError {
    match error.into_kind() {
        csv::ErrorKind::Io(io) if io.kind() == ErrorKind::NotFound => MarketDataError::NotFound {
            symbol: symbol.to_string(),
        },
        csv::ErrorKind::Io(io) => MarketDataError::Io {
            symbol: symbol.to_string(),
            source: io,
        },
        other => MarketDataError::InvalidData {
            symbol: symbol.to_string(),
            reason: format!("{:?}", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::HistoryPeriod;
    use std::fs;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quantvision-csv-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_yahoo_style_file() {
        let dir = temp_dir();
        fs::write(
            dir.join("AAPL.csv"),
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-03,10,11,9,10.5,10.4,1000\n\
             2024-01-02,9,10,8,9.5,9.4,900\n\
             2024-01-04,10.5,12,10,,11.8,1100\n\
             2024-01-05,11,12,10.5,11.5,11.4,1200\n",
        )
        .unwrap();

        let source = CsvMarketDataSource::new(&dir);
        let request = HistoryRequest {
            period: HistoryPeriod::Max,
            ..HistoryRequest::serving()
        };
        let series = source.fetch_history("aapl", &request).unwrap();

        // Row with an empty close is dropped; the rest are sorted and adjusted
        assert_eq!(series.len(), 3);
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.closes(), vec![9.4, 10.4, 11.4]);
        let first = series.bars()[0];
        assert!((first.high - 10.0 * 9.4 / 9.5).abs() < 1e-12);
        assert!(first.low <= first.close && first.close <= first.high);

        let raw = CsvMarketDataSource::new(&dir)
            .with_adjusted(false)
            .fetch_history("aapl", &request)
            .unwrap();
        assert_eq!(raw.closes(), vec![9.5, 10.5, 11.5]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_trims_to_period() {
        let dir = temp_dir();
        fs::write(
            dir.join("MSFT.csv"),
            "date,open,high,low,close,volume\n\
             2023-01-02,1,1,1,1,1\n\
             2024-01-02,2,2,2,2,1\n\
             2024-01-05,3,3,3,3,1\n",
        )
        .unwrap();

        let series = CsvMarketDataSource::new(&dir)
            .fetch_history("MSFT", &HistoryRequest::serving())
            .unwrap();
        assert_eq!(series.closes(), vec![2.0, 3.0]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = temp_dir();
        let err = CsvMarketDataSource::new(&dir)
            .fetch_history("NOPE", &HistoryRequest::serving())
            .unwrap_err();
        assert!(matches!(err, MarketDataError::NotFound { .. }));
        let _ = fs::remove_dir_all(&dir);
    }
}
