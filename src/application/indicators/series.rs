//! Aligned indicator series over a close-price vector.
//!
//! Every function returns one entry per input value. Entries before the
//! indicator's warm-up point are `None`. No function reads past index `i`
//! when producing entry `i`.

use crate::domain::errors::IndicatorError;
use statrs::statistics::Statistics;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};

pub type IndicatorSeries = Vec<Option<f64>>;

/// Simple moving average; first `window - 1` entries undefined.
pub fn sma(values: &[f64], window: usize) -> Result<IndicatorSeries, IndicatorError> {
    let mut sma = SimpleMovingAverage::new(window).map_err(|_| IndicatorError::InvalidWindow {
        indicator: "SMA",
        window,
    })?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let avg = sma.next(v);
            (i + 1 >= window).then_some(avg)
        })
        .collect())
}

/// Exponential smoothing with `k = 2 / (span + 1)`, seeded with the first value.
fn ema_values(values: &[f64], span: usize) -> Result<Vec<f64>, IndicatorError> {
    let mut ema =
        ExponentialMovingAverage::new(span).map_err(|_| IndicatorError::InvalidWindow {
            indicator: "EMA",
            window: span,
        })?;
    Ok(values.iter().map(|&v| ema.next(v)).collect())
}

/// Exponential moving average; first `span - 1` entries undefined.
pub fn ema(values: &[f64], span: usize) -> Result<IndicatorSeries, IndicatorError> {
    let raw = ema_values(values, span)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i + 1 >= span).then_some(v))
        .collect())
}

/// Relative Strength Index using Wilder's smoothing (`alpha = 1 / window`).
///
/// Average gain and loss are seeded with the first price change. The first
/// `window` entries are undefined. A window with no losses reads 100.
pub fn rsi(values: &[f64], window: usize) -> Result<IndicatorSeries, IndicatorError> {
    if window == 0 {
        return Err(IndicatorError::InvalidWindow {
            indicator: "RSI",
            window,
        });
    }

    let mut out = vec![None; values.len()];
    let alpha = 1.0 / window as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..values.len() {
        let change = values[i] - values[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i == 1 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain += alpha * (gain - avg_gain);
            avg_loss += alpha * (loss - avg_loss);
        }

        if i >= window {
            out[i] = Some(if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            });
        }
    }

    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

/// MACD line = EMA(fast) - EMA(slow), defined once the slow EMA has `slow` bars.
/// The signal EMA starts on the first defined MACD value and needs `signal` of them.
pub fn macd(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdSeries, IndicatorError> {
    if fast >= slow {
        return Err(IndicatorError::InvalidMacdPeriods { fast, slow });
    }
    let fast_ema = ema_values(values, fast)?;
    let slow_ema = ema_values(values, slow)?;
    let mut signal_ema =
        ExponentialMovingAverage::new(signal).map_err(|_| IndicatorError::InvalidWindow {
            indicator: "MACD signal",
            window: signal,
        })?;

    let n = values.len();
    let first_macd = slow - 1;
    let first_signal = first_macd + signal - 1;
    let mut series = MacdSeries {
        macd: vec![None; n],
        signal: vec![None; n],
        histogram: vec![None; n],
    };

    for i in first_macd..n {
        let line = fast_ema[i] - slow_ema[i];
        let sig = signal_ema.next(line);
        series.macd[i] = Some(line);
        if i >= first_signal {
            series.signal[i] = Some(sig);
            series.histogram[i] = Some(line - sig);
        }
    }

    Ok(series)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub middle: IndicatorSeries,
    pub upper: IndicatorSeries,
    pub lower: IndicatorSeries,
}

/// Bands at SMA(window) +/- k * population stddev over the same window.
pub fn bollinger(values: &[f64], window: usize, k: f64) -> Result<BollingerSeries, IndicatorError> {
    let middle = sma(values, window).map_err(|_| IndicatorError::InvalidWindow {
        indicator: "Bollinger",
        window,
    })?;

    let mut upper = vec![None; values.len()];
    let mut lower = vec![None; values.len()];
    for (i, mid) in middle.iter().enumerate() {
        if let Some(mid) = mid {
            let sd = values[i + 1 - window..=i].iter().population_std_dev();
            upper[i] = Some(mid + k * sd);
            lower[i] = Some(mid - k * sd);
        }
    }

    Ok(BollingerSeries {
        middle,
        upper,
        lower,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let value = actual.expect("value should be defined");
        assert!(
            (value - expected).abs() < 1e-12,
            "expected {expected}, got {value}"
        );
    }

    #[test]
    fn test_sma_hand_computed() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_sma_shorter_than_window_is_all_undefined() {
        let out = sma(&[1.0, 2.0], 3).unwrap();
        assert_eq!(out, vec![None, None]);
        assert!(sma(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(
            sma(&[1.0], 0),
            Err(IndicatorError::InvalidWindow {
                indicator: "SMA",
                window: 0
            })
        );
        assert!(rsi(&[1.0], 0).is_err());
        assert!(ema(&[1.0], 0).is_err());
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        // span 3 => k = 0.5
        let out = ema(&[2.0, 4.0, 6.0], 3).unwrap();
        assert_eq!(out, vec![None, None, Some(4.5)]);
    }

    #[test]
    fn test_rsi_wilder_hand_computed() {
        // changes +1, +1, -1 with window 2:
        // i=2: gain 1, loss 0 -> 100; i=3: gain 0.5, loss 0.5 -> 50
        let out = rsi(&[1.0, 2.0, 3.0, 2.0], 2).unwrap();
        assert_eq!(out, vec![None, None, Some(100.0), Some(50.0)]);
    }

    #[test]
    fn test_rsi_warmup_is_window_entries() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64).sin()).collect();
        let out = rsi(&values, 14).unwrap();
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14..].iter().all(Option::is_some));
        assert!(out.iter().flatten().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_monotonic_up_reads_100() {
        let values: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let out = rsi(&values, 14).unwrap();
        assert_eq!(out[19], Some(100.0));
    }

    #[test]
    fn test_macd_hand_computed() {
        // fast EMA(1) tracks price; slow EMA(3): 1, 1.5, 2.25, 3.125
        let out = macd(&[1.0, 2.0, 3.0, 4.0], 1, 3, 2).unwrap();
        assert_eq!(out.macd[..2], [None, None]);
        assert_close(out.macd[2], 0.75);
        assert_close(out.macd[3], 0.875);

        // signal EMA(2) seeded at 0.75, k = 2/3
        assert_eq!(out.signal[2], None);
        assert_close(out.signal[3], 0.875 * 2.0 / 3.0 + 0.75 / 3.0);
        assert_close(out.histogram[3], 0.875 - (0.875 * 2.0 / 3.0 + 0.75 / 3.0));
    }

    #[test]
    fn test_macd_standard_warmup() {
        let values: Vec<f64> = (0..60).map(|i| 50.0 + (i as f64 * 0.3).cos()).collect();
        let out = macd(&values, 12, 26, 9).unwrap();
        assert!(out.macd[..25].iter().all(Option::is_none));
        assert!(out.macd[25..].iter().all(Option::is_some));
        assert!(out.signal[..33].iter().all(Option::is_none));
        assert!(out.signal[33..].iter().all(Option::is_some));
    }

    #[test]
    fn test_macd_constant_series_is_zero() {
        let out = macd(&[7.0; 40], 12, 26, 9).unwrap();
        assert_eq!(out.macd[39], Some(0.0));
        assert_eq!(out.signal[39], Some(0.0));
    }

    #[test]
    fn test_macd_rejects_inverted_periods() {
        assert_eq!(
            macd(&[1.0], 26, 12, 9),
            Err(IndicatorError::InvalidMacdPeriods { fast: 26, slow: 12 })
        );
    }

    #[test]
    fn test_bollinger_hand_computed() {
        let out = bollinger(&[1.0, 2.0, 3.0, 4.0, 5.0], 3, 2.0).unwrap();
        let sd = (2.0f64 / 3.0).sqrt();

        assert_eq!(out.upper[..2], [None, None]);
        assert_eq!(out.middle[2], Some(2.0));
        assert_close(out.upper[2], 2.0 + 2.0 * sd);
        assert_close(out.lower[2], 2.0 - 2.0 * sd);
        assert_close(out.upper[4], 4.0 + 2.0 * sd);
    }

    #[test]
    fn test_bollinger_constant_series_collapses() {
        let out = bollinger(&[5.0; 25], 20, 2.0).unwrap();
        assert_eq!(out.upper[24], Some(5.0));
        assert_eq!(out.lower[24], Some(5.0));
    }

    #[test]
    fn test_no_look_ahead() {
        let base: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let mut shocked = base.clone();
        shocked[79] = 500.0;

        let a = macd(&base, 12, 26, 9).unwrap();
        let b = macd(&shocked, 12, 26, 9).unwrap();
        assert_eq!(a.macd[..79], b.macd[..79]);
        assert_eq!(
            rsi(&base, 14).unwrap()[..79],
            rsi(&shocked, 14).unwrap()[..79]
        );
        assert_eq!(
            bollinger(&base, 20, 2.0).unwrap().upper[..79],
            bollinger(&shocked, 20, 2.0).unwrap().upper[..79]
        );
    }
}
