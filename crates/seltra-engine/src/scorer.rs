//! Capital efficiency scoring.
//!
//! A range scores by how far its center sits from the current price,
//! measured against a volatility-scaled "reasonable distance":
//! - within it: linear falloff from 10_000 to 5_000
//! - beyond it: `5_000 * mrd / (mrd + distance)`, strictly decreasing
//! - zero volatility: 10_000 within 1% of the price, else 1_000
//!
//! The set's score is the liquidity-weighted mean over funded ranges.

use seltra_core::{Price, RangeSet};

/// Highest attainable score.
pub const MAX_SCORE: u64 = 10_000;

/// Divisor turning `price * volatility` into the reasonable distance.
pub const REASONABLE_DISTANCE_DIVISOR: u128 = 5_000;

const INNER_FALLOFF: u128 = 5_000;
const OUTER_CEILING: u128 = 5_000;
const FLAT_NEAR_SCORE: u128 = 10_000;
const FLAT_FAR_SCORE: u128 = 1_000;

// Liquidity is shifted down until `score * liquidity` sums cannot overflow.
// Relies on `RangeSet` totals fitting in a u128.
const WEIGHT_BITS: u32 = 114;

/// Score a range set against the current price and volatility (1e6 scale).
pub fn score(ranges: &RangeSet, price: Price, volatility: u64) -> u64 {
    let raw_total = ranges.total_liquidity();
    if raw_total == 0 {
        return 0;
    }
    let shift = (128 - raw_total.leading_zeros()).saturating_sub(WEIGHT_BITS);

    let mrd = price.raw().saturating_mul(volatility as u128) / REASONABLE_DISTANCE_DIVISOR;

    let (weighted, total) = ranges
        .iter()
        .filter(|r| !r.is_empty())
        .fold((0u128, 0u128), |(acc, total), r| {
            let liquidity = r.liquidity >> shift;
            let distance = r.center().abs_diff(price);
            let s = range_score(distance, mrd, price);
            (acc + s * liquidity, total + liquidity)
        });

    if total == 0 {
        return 0;
    }
    (weighted / total).min(MAX_SCORE as u128) as u64
}

fn range_score(distance: u128, mrd: u128, price: Price) -> u128 {
    if mrd == 0 {
        return if distance < price.raw() / 100 {
            FLAT_NEAR_SCORE
        } else {
            FLAT_FAR_SCORE
        };
    }
    if distance <= mrd {
        // distance <= mrd keeps the subtrahend at most INNER_FALLOFF.
        MAX_SCORE as u128 - distance.saturating_mul(INNER_FALLOFF) / mrd
    } else {
        OUTER_CEILING.saturating_mul(mrd) / mrd.saturating_add(distance)
    }
}
