use crate::domain::errors::MarketDataError;
use crate::domain::market::{HistoryRequest, TimeSeries};

/// Supplier of historical bars for a ticker.
///
/// Calls are synchronous and never retried by the core. An empty series
/// means the ticker is unknown to the source.
pub trait MarketDataSource: Send + Sync {
    fn fetch_history(
        &self,
        symbol: &str,
        request: &HistoryRequest,
    ) -> Result<TimeSeries, MarketDataError>;

    /// Name used in logs
    fn name(&self) -> &str;
}
