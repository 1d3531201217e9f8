//! Liquidity range allocation.
//!
//! Spreads a total liquidity amount over `range_count` equal-width bands
//! around the current price. A band's weight carries a bonus of up to 50%
//! that falls off linearly with the distance of its center from the price,
//! reaching zero at half the band width. The result sums to the input total
//! exactly.

use seltra_core::{
    EngineError, EngineResult, LiquidityRange, Price, RangeSet, BPS_SCALE, MAX_RANGES,
};

/// Widest half-band around the price, in percent.
pub const MAX_BOUND_PCT: u128 = 50;

/// Weight every band receives before the proximity bonus.
pub const BASE_WEIGHT: u128 = 10_000;

/// Proximity is scored on a 0..=10_000 scale.
const PROXIMITY_SCALE: u128 = 10_000;

/// Build the range set for a price and regime profile.
pub fn allocate(
    current_price: Price,
    concentration_factor: u64,
    range_count: usize,
    total_liquidity: u128,
) -> EngineResult<RangeSet> {
    if current_price.is_zero() {
        return Err(EngineError::InvalidInput("price must be positive".to_string()));
    }
    if concentration_factor == 0 {
        return Err(EngineError::InvalidInput(
            "concentration factor must be positive".to_string(),
        ));
    }
    if range_count == 0 || range_count > MAX_RANGES {
        return Err(EngineError::InvalidInput(format!(
            "range count must be in [1, {MAX_RANGES}], got {range_count}"
        )));
    }
    if total_liquidity == 0 {
        return Err(EngineError::InvalidInput(
            "total liquidity must be positive".to_string(),
        ));
    }

    let (min_price, max_price) = band(current_price, concentration_factor)?;
    let bounds = partition(min_price, max_price, range_count)?;

    let distances: Vec<u128> = bounds
        .iter()
        .map(|&(lo, hi)| LiquidityRange::new(lo, hi, 0).center().abs_diff(current_price))
        .collect();
    let max_distance = (max_price.raw() - min_price.raw()) / 2;
    if max_distance.checked_mul(PROXIMITY_SCALE).is_none() {
        return Err(EngineError::InvalidInput(format!(
            "price {current_price} too large"
        )));
    }

    let weights: Vec<u128> = distances
        .iter()
        .map(|&d| BASE_WEIGHT + proximity(d, max_distance) / 2)
        .collect();
    let weight_sum: u128 = weights.iter().sum();

    // floor(total * w / sum) without forming total * w.
    let (quotient, remainder) = (total_liquidity / weight_sum, total_liquidity % weight_sum);
    let mut liquidity: Vec<u128> = weights
        .iter()
        .map(|&w| quotient * w + remainder * w / weight_sum)
        .collect();

    let allocated: u128 = liquidity.iter().sum();
    let nearest = distances
        .iter()
        .enumerate()
        .min_by_key(|&(i, &d)| (d, i))
        .map(|(i, _)| i)
        .unwrap_or(0);
    liquidity[nearest] += total_liquidity - allocated;

    let ranges = bounds
        .into_iter()
        .zip(liquidity)
        .map(|((lo, hi), liq)| LiquidityRange::new(lo, hi, liq))
        .collect();
    RangeSet::new(ranges)
}

/// Price band `[min, max]` for a concentration factor.
fn band(price: Price, concentration_factor: u64) -> EngineResult<(Price, Price)> {
    let bound_pct = (concentration_factor as u128 * 100 / BPS_SCALE as u128).min(MAX_BOUND_PCT);
    let p = price.raw();
    let price_range = p
        .checked_mul(bound_pct)
        .ok_or_else(|| EngineError::InvalidInput(format!("price {price} too large")))?
        / 100;

    let mut min = p - price_range;
    let mut max = p
        .checked_add(price_range)
        .ok_or_else(|| EngineError::InvalidInput(format!("price {price} too large")))?;

    if min == 0 {
        min = p / 2;
    }
    if max <= min {
        max = min
            .checked_add(p / 10)
            .ok_or_else(|| EngineError::InvalidInput(format!("price {price} too large")))?;
    }
    Ok((Price::from_raw(min), Price::from_raw(max)))
}

/// Equal-width split; the last band absorbs the integer remainder of the width.
fn partition(min: Price, max: Price, count: usize) -> EngineResult<Vec<(Price, Price)>> {
    let step = (max.raw() - min.raw()) / count as u128;
    if step == 0 {
        return Err(EngineError::InvalidInput(format!(
            "band [{min}, {max}] cannot be split into {count} ranges"
        )));
    }
    Ok((0..count)
        .map(|i| {
            let lower = min.raw() + step * i as u128;
            let upper = if i + 1 == count { max.raw() } else { lower + step };
            (Price::from_raw(lower), Price::from_raw(upper))
        })
        .collect())
}

fn proximity(distance: u128, max_distance: u128) -> u128 {
    if max_distance == 0 {
        return PROXIMITY_SCALE;
    }
    // Fallback bands are not centered on the price; centers beyond the
    // half-width get no bonus.
    max_distance.saturating_sub(distance) * PROXIMITY_SCALE / max_distance
}
