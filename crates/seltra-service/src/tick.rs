//! JSON-lines tick input.
//!
//! One tick per line:
//! `{"pool": "algo-usdc", "price": "0.2351", "ts": 120}`
//! `price` may be a string or a number; `ts` (monotonic seconds) is optional.

use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;
use seltra_core::Price;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickMessage {
    pub pool: String,
    pub price: Decimal,
    #[serde(default)]
    pub ts: Option<u64>,
}

impl TickMessage {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> AppResult<Option<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        let msg: Self = serde_json::from_str(trimmed)
            .map_err(|e| AppError::Tick(format!("{e}: {trimmed}")))?;
        Ok(Some(msg))
    }

    pub fn fixed_price(&self) -> AppResult<Price> {
        let price = Price::from_decimal(self.price)?;
        if price.is_zero() {
            return Err(AppError::Tick(format!(
                "non-positive price {} for pool {}",
                self.price, self.pool
            )));
        }
        Ok(price)
    }
}
