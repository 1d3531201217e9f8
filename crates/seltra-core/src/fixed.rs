//! Fixed-point scalars and the decimal display adapter.
//!
//! All engine arithmetic is integer arithmetic on fixed scales:
//! - prices: 1e18 (`u128`)
//! - volatility and returns: 1e6 (`u64` / `i128`)
//! - concentration factors, basis points, efficiency scores: 1e4 (`u64`)
//!
//! `rust_decimal` is only used at the edges (config parsing, logging),
//! never inside a computation.

use crate::error::{EngineError, EngineResult};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Decimal places carried by a [`Price`].
pub const PRICE_DECIMALS: u32 = 18;

/// One unit of price (1.0) in fixed-point form.
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Scale for volatility, returns, and the EWMA smoothing factor.
pub const VOLATILITY_SCALE: u64 = 1_000_000;

/// Scale for concentration factors, basis points, and efficiency scores.
pub const BPS_SCALE: u64 = 10_000;

/// Upper bound on Newton iterations in [`isqrt`].
pub const MAX_SQRT_ITERATIONS: usize = 10;

/// Positive price at 1e18 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u128);

impl Price {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(PRICE_SCALE);

    #[inline]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole price units, e.g. `Price::from_units(2)` is 2.0.
    #[inline]
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * PRICE_SCALE)
    }

    #[inline]
    pub const fn raw(&self) -> u128 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn abs_diff(&self, other: Price) -> u128 {
        self.0.abs_diff(other.0)
    }

    #[inline]
    pub fn checked_add(&self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[inline]
    pub fn checked_sub(&self, rhs: Price) -> Option<Price> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Convert to a human-readable decimal.
    pub fn to_decimal(&self) -> EngineResult<Decimal> {
        let raw = i128::try_from(self.0)
            .map_err(|_| EngineError::InvalidInput(format!("price {} out of range", self.0)))?;
        Decimal::try_from_i128_with_scale(raw, PRICE_DECIMALS)
            .map_err(|e| EngineError::InvalidInput(format!("price {} not representable: {e}", self.0)))
    }

    /// Parse a decimal into a fixed-point price, truncating digits past 1e-18.
    pub fn from_decimal(value: Decimal) -> EngineResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(EngineError::InvalidInput(format!(
                "negative price: {value}"
            )));
        }
        let mantissa = value.mantissa().unsigned_abs();
        let scale = value.scale();
        let raw = if scale <= PRICE_DECIMALS {
            10u128
                .checked_pow(PRICE_DECIMALS - scale)
                .and_then(|m| mantissa.checked_mul(m))
        } else {
            Some(mantissa / 10u128.pow(scale - PRICE_DECIMALS))
        };
        raw.map(Self)
            .ok_or_else(|| EngineError::InvalidInput(format!("price {value} overflows")))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(d) => write!(f, "{}", d.normalize()),
            Err(_) => write!(f, "{}e-{PRICE_DECIMALS}", self.0),
        }
    }
}

impl FromStr for Price {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d = Decimal::from_str(s.trim())
            .map_err(|e| EngineError::InvalidInput(format!("invalid price '{s}': {e}")))?;
        Self::from_decimal(d)
    }
}

impl Add for Price {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

// Raw u128 travels as a decimal string so it survives JSON consumers that
// only carry f64/i64 numbers.
impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map(Self).map_err(de::Error::custom)
    }
}

/// Serde adapter for `u128` fields encoded as decimal strings.
pub mod u128_str {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(de::Error::custom)
    }
}

/// Floor square root by Newton iteration.
///
/// The first guess is the smallest power of two at or above `sqrt(x)`, so the
/// iterates decrease monotonically onto the floor root well inside
/// [`MAX_SQRT_ITERATIONS`] steps for any `u128`.
pub fn isqrt(x: u128) -> u128 {
    if x < 2 {
        return x;
    }
    let bits = 128 - x.leading_zeros();
    let mut z: u128 = 1 << bits.div_ceil(2);
    for _ in 0..MAX_SQRT_ITERATIONS {
        let y = (z + x / z) / 2;
        if y >= z {
            return z;
        }
        z = y;
    }
    z
}

/// Volatility (1e6 scale) as a percentage, for display.
pub fn volatility_to_percent(volatility: u64) -> Decimal {
    Decimal::from(volatility) / Decimal::from(BPS_SCALE)
}

/// Basis-point quantity (1e4 scale) as a percentage, for display.
pub fn bps_to_percent(bps: u64) -> Decimal {
    Decimal::from(bps) / Decimal::from(100u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_isqrt_small_values() {
        let cases: [(u128, u128); 9] = [
            (0, 0),
            (1, 1),
            (2, 1),
            (3, 1),
            (4, 2),
            (8, 2),
            (9, 3),
            (99, 9),
            (100, 10),
        ];
        for (x, expected) in cases {
            assert_eq!(isqrt(x), expected, "isqrt({x})");
        }
    }

    #[test]
    fn test_isqrt_is_floor_root_for_large_values() {
        assert_eq!(isqrt(u128::MAX), u64::MAX as u128);
        assert_eq!(isqrt(1_000_000_000_000), 1_000_000);
        assert_eq!(isqrt(999_999_999_999), 999_999);

        for x in [
            12_345_678_901_234_567_890_u128,
            (1u128 << 100) + 7,
            PRICE_SCALE * PRICE_SCALE - 1,
        ] {
            let r = isqrt(x);
            assert!(r * r <= x);
            assert!((r + 1) * (r + 1) > x);
        }
    }

    #[test]
    fn test_price_decimal_conversion() {
        let p = Price::from_decimal(dec!(1.5)).unwrap();
        assert_eq!(p.raw(), 1_500_000_000_000_000_000);
        assert_eq!(p.to_decimal().unwrap().normalize(), dec!(1.5));
        assert_eq!(p.to_string(), "1.5");

        assert_eq!(Price::from_units(3), Price::from_decimal(dec!(3)).unwrap());
        assert!(Price::from_decimal(dec!(-1)).is_err());
    }

    #[test]
    fn test_price_from_str_truncates_excess_precision() {
        let p: Price = "0.0000000000000000019".parse().unwrap();
        assert_eq!(p.raw(), 1);
        assert!("abc".parse::<Price>().is_err());
    }

    #[test]
    fn test_price_serde_as_string() {
        let p = Price::from_units(2);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"2000000000000000000\"");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_display_adapters() {
        assert_eq!(volatility_to_percent(45_000), dec!(4.5));
        assert_eq!(bps_to_percent(6_000), dec!(60));
    }
}
