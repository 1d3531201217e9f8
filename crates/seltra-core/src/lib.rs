//! Core domain types for the Seltra rebalancing engine.
//!
//! This crate provides the fixed-point vocabulary shared by every other crate:
//! - `Price` and the scale constants (prices 1e18, volatility 1e6, bps 1e4)
//! - `isqrt`: bounded Newton square root
//! - `LiquidityRange`, `RangeSet`: bounded range collections with JSON encoding
//! - `Regime`, `classify`: volatility regimes, their lookup table and classifier
//! - `EngineError`, `UnsafeReason`: the error taxonomy

pub mod error;
pub mod fixed;
pub mod range;
pub mod regime;
pub mod types;

pub use error::{EngineError, EngineResult, UnsafeReason};
pub use fixed::{
    bps_to_percent, isqrt, volatility_to_percent, Price, BPS_SCALE, PRICE_DECIMALS, PRICE_SCALE,
    VOLATILITY_SCALE,
};
pub use range::{LiquidityRange, RangeSet, MAX_RANGES};
pub use regime::{classify, Regime, RegimeProfile, REGIME_TABLE};
pub use types::PriceObservation;
