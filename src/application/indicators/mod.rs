//! Indicator engine shared by dataset construction and serving.
//!
//! Both paths call [`IndicatorFrame::compute`]; there is no other way to
//! produce model inputs from bars.

pub mod frame;
pub mod series;

pub use frame::{IndicatorFrame, IndicatorParams};
pub use series::{BollingerSeries, IndicatorSeries, MacdSeries, bollinger, ema, macd, rsi, sma};
