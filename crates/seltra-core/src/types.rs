//! Observation types fed into the engine.

use crate::error::{EngineError, EngineResult};
use crate::fixed::Price;
use serde::{Deserialize, Serialize};

/// A price tick with its monotonic arrival time (whole seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price: Price,
    pub observed_at: u64,
}

impl PriceObservation {
    pub fn new(price: Price, observed_at: u64) -> EngineResult<Self> {
        if price.is_zero() {
            return Err(EngineError::InvalidInput(
                "price must be positive".to_string(),
            ));
        }
        Ok(Self { price, observed_at })
    }
}
