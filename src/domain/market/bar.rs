use crate::domain::errors::MarketDataError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Checks the bar is physically possible. Logs and returns false otherwise.
    pub fn is_valid(&self, symbol: &str) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            warn!(
                "Bar for {} on {} has non-positive or non-finite price component(s)",
                symbol, self.date
            );
            return false;
        }
        if self.low > self.high {
            warn!(
                "Bar for {} on {} has low {} > high {}",
                symbol, self.date, self.low, self.high
            );
            return false;
        }
        if self.volume < 0.0 {
            warn!(
                "Bar for {} on {} has negative volume: {}",
                symbol, self.date, self.volume
            );
            return false;
        }
        true
    }
}

/// Bars for one instrument, strictly ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl TimeSeries {
    /// Builds a series, rejecting duplicate or out-of-order dates and invalid bars.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, MarketDataError> {
        let symbol = symbol.into();
        if let Some(bad) = bars.iter().find(|b| !b.is_valid(&symbol)) {
            return Err(MarketDataError::InvalidData {
                reason: format!("invalid bar on {} (close {})", bad.date, bad.close),
                symbol,
            });
        }
        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(MarketDataError::InvalidData {
                symbol,
                reason: format!(
                    "bars not strictly ascending: {} followed by {}",
                    pair[0].date, pair[1].date
                ),
            });
        }
        Ok(Self { symbol, bars })
    }

    /// Sorts bars by date and drops duplicated dates (first occurrence wins).
    /// Invalid bars are dropped with a warning.
    pub fn from_unsorted(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        let symbol = symbol.into();
        bars.retain(|b| b.is_valid(&symbol));
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self { symbol, bars }
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Keeps only the most recent `n` bars.
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.bars.len().saturating_sub(n);
        Self {
            symbol: self.symbol.clone(),
            bars: self.bars[skip..].to_vec(),
        }
    }

    /// Keeps bars dated strictly after `cutoff`.
    pub fn since(&self, cutoff: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.date > cutoff)
                .copied()
                .collect(),
        }
    }
}
