//! Volatility regimes and their allocation profiles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market volatility regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    UltraLow,
    Low,
    Medium,
    High,
    Extreme,
}

impl Regime {
    pub const ALL: [Regime; 5] = [
        Regime::UltraLow,
        Regime::Low,
        Regime::Medium,
        Regime::High,
        Regime::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UltraLow => "ultra_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }

    /// Ordinal used for gauges (0 = ultra_low .. 4 = extreme).
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    /// Allocation profile for this regime.
    pub fn profile(&self) -> RegimeProfile {
        REGIME_TABLE[*self as usize]
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allocation parameters attached to a regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeProfile {
    pub regime: Regime,
    /// Exclusive upper volatility bound (1e6 scale); `None` for the top regime.
    pub volatility_below: Option<u64>,
    /// Concentration factor (1e4 scale).
    pub concentration_factor: u64,
    /// Number of ranges to deploy.
    pub range_count: usize,
}

/// Regime lookup table, ordered by ascending volatility.
pub const REGIME_TABLE: [RegimeProfile; 5] = [
    RegimeProfile {
        regime: Regime::UltraLow,
        volatility_below: Some(15_000),
        concentration_factor: 4_000,
        range_count: 2,
    },
    RegimeProfile {
        regime: Regime::Low,
        volatility_below: Some(30_000),
        concentration_factor: 6_000,
        range_count: 3,
    },
    RegimeProfile {
        regime: Regime::Medium,
        volatility_below: Some(60_000),
        concentration_factor: 10_000,
        range_count: 4,
    },
    RegimeProfile {
        regime: Regime::High,
        volatility_below: Some(120_000),
        concentration_factor: 18_000,
        range_count: 5,
    },
    RegimeProfile {
        regime: Regime::Extreme,
        volatility_below: None,
        concentration_factor: 25_000,
        range_count: 6,
    },
];

/// Map a volatility reading (1e6 scale) to its regime profile.
///
/// Thresholds are half-open: a reading exactly on a boundary belongs to the
/// higher regime.
pub fn classify(volatility: u64) -> RegimeProfile {
    REGIME_TABLE
        .iter()
        .find(|p| p.volatility_below.map_or(true, |bound| volatility < bound))
        .copied()
        .unwrap_or(REGIME_TABLE[REGIME_TABLE.len() - 1])
}
