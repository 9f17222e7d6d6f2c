pub mod csv_market_data;
pub mod mock;
pub mod model_store;
pub mod observability;

pub use csv_market_data::CsvMarketDataSource;
pub use mock::InMemoryMarketDataSource;
pub use model_store::ModelStore;
