// Bars and validated time series
pub mod bar;

// History request contract for market-data collaborators
pub mod history;

pub use bar::{Bar, TimeSeries};
pub use history::{BarInterval, HistoryPeriod, HistoryRequest};
