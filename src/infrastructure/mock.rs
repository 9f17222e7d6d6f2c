use crate::domain::errors::MarketDataError;
use crate::domain::market::{Bar, HistoryRequest, TimeSeries};
use crate::domain::ports::MarketDataSource;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Market-data source backed by in-memory series. Unknown tickers yield an empty series.
#[derive(Default)]
pub struct InMemoryMarketDataSource {
    series: HashMap<String, TimeSeries>,
    calls: AtomicUsize,
}

impl InMemoryMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: TimeSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: TimeSeries) {
        self.series
            .insert(series.symbol().to_uppercase(), series);
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl MarketDataSource for InMemoryMarketDataSource {
    fn fetch_history(
        &self,
        symbol: &str,
        request: &HistoryRequest,
    ) -> Result<TimeSeries, MarketDataError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let Some(series) = self.series.get(&symbol.to_uppercase()) else {
            info!("MockMarketData: no series for {}", symbol);
            return Ok(TimeSeries::empty(symbol));
        };

        let trimmed = match series
            .last()
            .and_then(|last| request.period.cutoff(last.date))
        {
            Some(cutoff) => series.since(cutoff),
            None => series.clone(),
        };
        Ok(trimmed)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Consecutive weekdays starting at 2015-01-05.
pub fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut day = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap_or_default();
    let mut days = Vec::with_capacity(n);
    while days.len() < n {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day = day.succ_opt().unwrap_or(day);
    }
    days
}

/// Builds a series from close prices, with a tight synthetic range around each close.
pub fn series_from_closes(symbol: &str, closes: &[f64]) -> TimeSeries {
    let bars = trading_days(closes.len())
        .into_iter()
        .zip(closes)
        .map(|(date, &close)| Bar {
            date,
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000_000.0,
        })
        .collect();
    TimeSeries::from_unsorted(symbol, bars)
}

/// `start, start + step, start + 2 * step, ...`
pub fn linear_series(symbol: &str, n: usize, start: f64, step: f64) -> TimeSeries {
    let closes: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    series_from_closes(symbol, &closes)
}

/// Oscillating closes around `level` with the given amplitude and period (in bars).
pub fn sine_series(symbol: &str, n: usize, level: f64, amplitude: f64, period: f64) -> TimeSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let phase = i as f64 * std::f64::consts::TAU / period;
            level + amplitude * phase.sin() + 0.37 * amplitude * (2.3 * phase).cos()
        })
        .collect();
    series_from_closes(symbol, &closes)
}
