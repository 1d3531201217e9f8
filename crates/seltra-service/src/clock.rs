//! Monotonic time source for cooldown and staleness checks.

use std::time::Instant;

/// Source of whole monotonic seconds.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// Seconds elapsed since the clock was created.
///
/// Backed by `Instant`, so wall-clock adjustments never move it backwards.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

/// Tick timestamp if supplied, otherwise the clock's current reading.
pub fn resolve_timestamp(clock: &dyn Clock, supplied: Option<u64>) -> u64 {
    supplied.unwrap_or_else(|| clock.now_secs())
}
