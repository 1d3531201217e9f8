//! Liquidity ranges and bounded range sets.

use crate::error::{EngineError, EngineResult};
use crate::fixed::{u128_str, Price};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of ranges a pool may deploy at once.
pub const MAX_RANGES: usize = 6;

/// A price band `[lower, upper)` holding some liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRange {
    pub lower: Price,
    pub upper: Price,
    #[serde(with = "u128_str")]
    pub liquidity: u128,
}

impl LiquidityRange {
    pub const fn new(lower: Price, upper: Price, liquidity: u128) -> Self {
        Self {
            lower,
            upper,
            liquidity,
        }
    }

    /// A range with no liquidity is ignored by scoring and validation.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.liquidity == 0
    }

    #[inline]
    pub fn has_valid_bounds(&self) -> bool {
        !self.lower.is_zero() && self.lower < self.upper
    }

    #[inline]
    pub fn width(&self) -> u128 {
        self.upper.raw().saturating_sub(self.lower.raw())
    }

    /// Midpoint of the band.
    #[inline]
    pub fn center(&self) -> Price {
        let (lo, hi) = (self.lower.raw(), self.upper.raw());
        Price::from_raw(lo / 2 + hi / 2 + (lo % 2 + hi % 2) / 2)
    }

    #[inline]
    pub fn contains(&self, price: Price) -> bool {
        self.lower <= price && price < self.upper
    }

    /// Width relative to the lower bound, in basis points.
    pub fn size_bps(&self) -> u128 {
        if self.lower.is_zero() {
            return 0;
        }
        self.width().saturating_mul(10_000) / self.lower.raw()
    }
}

/// Ordered collection of at most [`MAX_RANGES`] ranges whose total
/// liquidity fits in a `u128`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RangeSet {
    ranges: Vec<LiquidityRange>,
}

impl RangeSet {
    pub fn new(ranges: Vec<LiquidityRange>) -> EngineResult<Self> {
        if ranges.len() > MAX_RANGES {
            return Err(EngineError::InvalidInput(format!(
                "range set holds {} ranges, max {MAX_RANGES}",
                ranges.len()
            )));
        }
        ranges
            .iter()
            .try_fold(0u128, |acc, r| acc.checked_add(r.liquidity))
            .ok_or_else(|| {
                EngineError::InvalidInput("range set total liquidity overflows u128".to_string())
            })?;
        Ok(Self { ranges })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiquidityRange> {
        self.ranges.iter()
    }

    pub fn as_slice(&self) -> &[LiquidityRange] {
        &self.ranges
    }

    pub fn get(&self, index: usize) -> Option<&LiquidityRange> {
        self.ranges.get(index)
    }

    /// Sum of liquidity over all ranges. Cannot overflow; see [`RangeSet::new`].
    pub fn total_liquidity(&self) -> u128 {
        self.ranges.iter().map(|r| r.liquidity).sum()
    }

    /// True when no range carries liquidity.
    pub fn is_unfunded(&self) -> bool {
        self.ranges.iter().all(LiquidityRange::is_empty)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let ranges: Vec<LiquidityRange> = serde_json::from_str(json)?;
        Self::new(ranges)
    }
}

impl<'de> Deserialize<'de> for RangeSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ranges = Vec::<LiquidityRange>::deserialize(deserializer)?;
        Self::new(ranges).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = &'a LiquidityRange;
    type IntoIter = std::slice::Iter<'a, LiquidityRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "({},{},{})", r.lower, r.upper, r.liquidity)?;
        }
        write!(f, "]")
    }
}
