//! Error types for the rebalancing engine.

use thiserror::Error;

/// Why a proposed range transition was rejected by the safety checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafeReason {
    #[error("liquidity not conserved: old={old}, new={new}")]
    LiquidityNotConserved { old: u128, new: u128 },

    #[error("range {index} has invalid bounds")]
    InvalidBounds { index: usize },

    #[error("range {index} is too narrow: {size_bps} bps < {min_bps} bps")]
    RangeTooSmall {
        index: usize,
        size_bps: u128,
        min_bps: u64,
    },
}

impl UnsafeReason {
    /// Stable machine-readable code, used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LiquidityNotConserved { .. } => "LIQUIDITY_NOT_CONSERVED",
            Self::InvalidBounds { .. } => "INVALID_BOUNDS",
            Self::RangeTooSmall { .. } => "RANGE_TOO_SMALL",
        }
    }

    /// Index of the offending range, if the failure is range-specific.
    pub fn range_index(&self) -> Option<usize> {
        match self {
            Self::LiquidityNotConserved { .. } => None,
            Self::InvalidBounds { index }
            | Self::RangeTooSmall { index, .. } => Some(*index),
        }
    }
}

/// Engine error taxonomy.
///
/// Every public engine operation either succeeds or returns one of these,
/// and no state is mutated on the error path.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Unsafe rebalance: {0}")]
    Unsafe(UnsafeReason),

    #[error("Insufficient efficiency gain: {gain} bps")]
    InsufficientGain { gain: i64 },

    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: String },

    #[error("Rebalance cooldown active: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<UnsafeReason> for EngineError {
    fn from(reason: UnsafeReason) -> Self {
        Self::Unsafe(reason)
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
