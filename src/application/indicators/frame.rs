use super::series::{IndicatorSeries, bollinger, macd, rsi, sma};
use crate::domain::errors::IndicatorError;
use crate::domain::market::TimeSeries;
use crate::domain::ml::feature_registry::{FeatureName, FeatureSource};
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::debug;

/// Fixed indicator parameters shared by training and serving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub rsi_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_window: usize,
    pub bb_std_dev: f64,
}

impl IndicatorParams {
    pub const STANDARD: IndicatorParams = IndicatorParams {
        sma_fast: 50,
        sma_slow: 200,
        rsi_window: 14,
        macd_fast: 12,
        macd_slow: 26,
        macd_signal: 9,
        bb_window: 20,
        bb_std_dev: 2.0,
    };

    /// Bars needed before every indicator is defined.
    pub const fn longest_warmup(&self) -> usize {
        let mut longest = self.sma_fast;
        if self.sma_slow > longest {
            longest = self.sma_slow;
        }
        if self.rsi_window + 1 > longest {
            longest = self.rsi_window + 1;
        }
        if self.macd_slow + self.macd_signal - 1 > longest {
            longest = self.macd_slow + self.macd_signal - 1;
        }
        if self.bb_window > longest {
            longest = self.bb_window;
        }
        longest
    }
}

/// Every indicator series for one time series, aligned bar-for-bar.
///
/// Built only through [`IndicatorFrame::compute`], which always applies
/// [`IndicatorParams::STANDARD`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub sma_50: IndicatorSeries,
    pub sma_200: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub macd: IndicatorSeries,
    pub macd_signal: IndicatorSeries,
    pub macd_histogram: IndicatorSeries,
    pub bb_middle: IndicatorSeries,
    pub bb_high: IndicatorSeries,
    pub bb_low: IndicatorSeries,
}

impl IndicatorFrame {
    pub fn compute(series: &TimeSeries) -> Result<Self, IndicatorError> {
        let params = IndicatorParams::STANDARD;
        let close = series.closes();

        let macd_series = macd(&close, params.macd_fast, params.macd_slow, params.macd_signal)?;
        let bands = bollinger(&close, params.bb_window, params.bb_std_dev)?;

        let frame = Self {
            dates: series.bars().iter().map(|b| b.date).collect(),
            sma_50: sma(&close, params.sma_fast)?,
            sma_200: sma(&close, params.sma_slow)?,
            rsi: rsi(&close, params.rsi_window)?,
            macd: macd_series.macd,
            macd_signal: macd_series.signal,
            macd_histogram: macd_series.histogram,
            bb_middle: bands.middle,
            bb_high: bands.upper,
            bb_low: bands.lower,
            close,
        };

        debug!(
            "Computed indicator frame for {} ({} bars)",
            series.symbol(),
            frame.close.len()
        );
        Ok(frame)
    }

    /// Computes frames for many tickers in parallel.
    pub fn compute_many(series: &[TimeSeries]) -> Vec<Result<Self, IndicatorError>> {
        series.par_iter().map(Self::compute).collect()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.close.len().checked_sub(1)
    }

    /// First index at which every indicator is defined.
    pub fn first_complete_index(&self) -> Option<usize> {
        (0..self.close.len()).find(|&i| {
            [
                &self.sma_50,
                &self.sma_200,
                &self.rsi,
                &self.macd,
                &self.macd_signal,
                &self.bb_high,
                &self.bb_low,
            ]
            .iter()
            .all(|s| s[i].is_some())
        })
    }
}

impl FeatureSource for IndicatorFrame {
    fn feature_value(&self, feature: FeatureName, index: usize) -> Option<f64> {
        match feature {
            FeatureName::Close => self.close.get(index).copied(),
            FeatureName::Sma50 => self.sma_50.get(index).copied().flatten(),
            FeatureName::Sma200 => self.sma_200.get(index).copied().flatten(),
            FeatureName::Rsi => self.rsi.get(index).copied().flatten(),
            FeatureName::Macd => self.macd.get(index).copied().flatten(),
            FeatureName::MacdSignal => self.macd_signal.get(index).copied().flatten(),
            FeatureName::BbHigh => self.bb_high.get(index).copied().flatten(),
            FeatureName::BbLow => self.bb_low.get(index).copied().flatten(),
        }
    }

    fn len(&self) -> usize {
        self.close.len()
    }
}
