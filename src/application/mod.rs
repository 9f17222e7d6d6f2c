// Technical indicators shared by training and serving
pub mod indicators;

// Dataset construction, training and serving
pub mod ml;
