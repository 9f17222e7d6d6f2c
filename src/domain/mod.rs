// Market data domain
pub mod market;

// Feature schema, datasets and predictions
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
