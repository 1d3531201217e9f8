//! Safety checks for range transitions.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. Liquidity conservation (old vs new totals within 0.1%)
//! 2. Structure of every funded range (`0 < lower < upper`)
//! 3. Minimum width of every funded range, relative to its lower bound
//!
//! Ranges without liquidity are empty slots and are skipped by 2 and 3.

use seltra_core::{LiquidityRange, RangeSet, UnsafeReason};
use serde::Serialize;

/// Conservation tolerance: `|old - new| <= old / CONSERVATION_DIVISOR`.
pub const CONSERVATION_DIVISOR: u128 = 1_000;

/// Outcome of a validation, for reporting across the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub ok: bool,
    /// Stable reason code when `ok` is false.
    pub reason: Option<String>,
    /// Offending range, for range-specific failures.
    pub range_index: Option<usize>,
}

impl From<Result<(), UnsafeReason>> for ValidationResult {
    fn from(result: Result<(), UnsafeReason>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                reason: None,
                range_index: None,
            },
            Err(reason) => Self {
                ok: false,
                reason: Some(reason.code().to_string()),
                range_index: reason.range_index(),
            },
        }
    }
}

/// Validate a transition from `old` to `new`.
pub fn validate(
    old: &RangeSet,
    new: &RangeSet,
    min_range_size_bps: u64,
) -> Result<(), UnsafeReason> {
    check_conservation(old, new)?;
    check_structure(new)?;
    check_sizes(new, min_range_size_bps)
}

/// Validate a first placement, where there is nothing to conserve against.
pub fn validate_initial(new: &RangeSet, min_range_size_bps: u64) -> Result<(), UnsafeReason> {
    check_structure(new)?;
    check_sizes(new, min_range_size_bps)
}

fn check_conservation(old: &RangeSet, new: &RangeSet) -> Result<(), UnsafeReason> {
    let old_total = old.total_liquidity();
    let new_total = new.total_liquidity();
    if old_total.abs_diff(new_total) > old_total / CONSERVATION_DIVISOR {
        return Err(UnsafeReason::LiquidityNotConserved {
            old: old_total,
            new: new_total,
        });
    }
    Ok(())
}

fn check_structure(new: &RangeSet) -> Result<(), UnsafeReason> {
    for (index, range) in funded(new) {
        if !range.has_valid_bounds() {
            return Err(UnsafeReason::InvalidBounds { index });
        }
    }
    Ok(())
}

fn check_sizes(new: &RangeSet, min_range_size_bps: u64) -> Result<(), UnsafeReason> {
    for (index, range) in funded(new) {
        let size_bps = range.size_bps();
        if size_bps < min_range_size_bps as u128 {
            return Err(UnsafeReason::RangeTooSmall {
                index,
                size_bps,
                min_bps: min_range_size_bps,
            });
        }
    }
    Ok(())
}

fn funded(set: &RangeSet) -> impl Iterator<Item = (usize, &LiquidityRange)> {
    set.iter().enumerate().filter(|(_, r)| !r.is_empty())
}
