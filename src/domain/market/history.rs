use anyhow::{Result, anyhow};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far back a history request reaches, in calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryPeriod {
    Days(u32),
    Max,
}

impl HistoryPeriod {
    /// Oldest date (exclusive) still covered when the newest bar is `latest`.
    pub fn cutoff(&self, latest: NaiveDate) -> Option<NaiveDate> {
        match self {
            HistoryPeriod::Days(days) => latest.checked_sub_signed(Duration::days(*days as i64)),
            HistoryPeriod::Max => None,
        }
    }
}

impl FromStr for HistoryPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "max" {
            return Ok(HistoryPeriod::Max);
        }

        let (digits, unit_days) = if let Some(n) = s.strip_suffix("mo") {
            (n, 30)
        } else if let Some(n) = s.strip_suffix('y') {
            (n, 365)
        } else if let Some(n) = s.strip_suffix('d') {
            (n, 1)
        } else {
            return Err(anyhow!(
                "Invalid period: {}. Use e.g. '10y', '6mo', '30d' or 'max'",
                s
            ));
        };

        let count: u32 = digits
            .parse()
            .map_err(|_| anyhow!("Invalid period count in '{}'", s))?;
        if count == 0 {
            return Err(anyhow!("Period must be positive: {}", s));
        }
        let days = count
            .checked_mul(unit_days)
            .ok_or_else(|| anyhow!("Period too large: {}", s))?;
        Ok(HistoryPeriod::Days(days))
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPeriod::Days(days) => write!(f, "{}d", days),
            HistoryPeriod::Max => write!(f, "max"),
        }
    }
}

/// Bar interval. Only daily bars carry the indicator contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarInterval {
    Daily,
}

impl FromStr for BarInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" | "daily" => Ok(BarInterval::Daily),
            other => Err(anyhow!("Unsupported interval: {}. Only '1d' is supported", other)),
        }
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarInterval::Daily => write!(f, "1d"),
        }
    }
}

/// Request handed to the market-data collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub period: HistoryPeriod,
    pub interval: BarInterval,
}

impl HistoryRequest {
    /// Ten years of daily bars, used for training runs.
    pub fn training() -> Self {
        Self {
            period: HistoryPeriod::Days(3650),
            interval: BarInterval::Daily,
        }
    }

    /// One year of daily bars, enough for the 200-bar warm-up at serving time.
    pub fn serving() -> Self {
        Self {
            period: HistoryPeriod::Days(365),
            interval: BarInterval::Daily,
        }
    }
}
