//! Volatility oracle configuration.

use seltra_core::VOLATILITY_SCALE;
use serde::{Deserialize, Serialize};

/// Largest accepted price-history window.
pub const MAX_WINDOW_SIZE: usize = 50;

/// EWMA oracle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// EWMA smoothing factor at 1e6 scale, in (0, 1_000_000].
    /// Default: 300,000 (0.3).
    #[serde(default = "default_alpha")]
    pub alpha: u64,

    /// Price-history ring capacity, in [1, 50]. Default: 10.
    /// The history is kept for diagnostics and does not feed the EWMA.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

fn default_alpha() -> u64 {
    300_000
}

fn default_window_size() -> usize {
    10
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            window_size: default_window_size(),
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.alpha == 0 || self.alpha > VOLATILITY_SCALE {
            return Err(format!(
                "alpha must be in (0, {VOLATILITY_SCALE}], got {}",
                self.alpha
            ));
        }
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(format!(
                "window_size must be in [1, {MAX_WINDOW_SIZE}], got {}",
                self.window_size
            ));
        }
        Ok(())
    }
}
