//! Volatility oracle for the Seltra rebalancing engine.
//!
//! Maintains an exponentially weighted mean and variance of price returns
//! per pool and reports volatility at 1e6 scale.

pub mod config;
pub mod estimator;

pub use config::{OracleConfig, MAX_WINDOW_SIZE};
pub use estimator::{VolatilityEstimator, VolatilityState};
