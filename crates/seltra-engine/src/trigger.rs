//! Rebalance trigger state machine and history.
//!
//! ```text
//! Idle ──evaluate──▶ Evaluating ──┬──▶ Triggered(reason) ──completed──▶ Idle
//!                                 └──▶ Suppressed(reason)
//! ```
//!
//! Conditions are checked in priority order: cooldown first (suppresses),
//! then poor efficiency, volatility shift, and staleness (each triggers).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Efficiency below this triggers a rebalance.
pub const POOR_EFFICIENCY_THRESHOLD: u64 = 6_000;

/// Volatility change (1e6 scale) above this triggers a rebalance.
pub const VOLATILITY_SHIFT_THRESHOLD: u64 = 20_000;

/// Ranges older than this (seconds) trigger a rebalance.
pub const STALE_AFTER_SECS: u64 = 3_600;

/// Why a rebalance was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerReason {
    PoorEfficiency,
    VolatilityShift,
    Stale,
}

impl TriggerReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::PoorEfficiency => "POOR_EFFICIENCY",
            Self::VolatilityShift => "VOLATILITY_SHIFT",
            Self::Stale => "STALE",
        }
    }
}

/// Why a rebalance was not triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuppressReason {
    Cooldown,
    NoCondition,
}

impl SuppressReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cooldown => "COOLDOWN_ACTIVE",
            Self::NoCondition => "NO_TRIGGER_CONDITION",
        }
    }
}

/// Result of a trigger evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Triggered(TriggerReason),
    Suppressed(SuppressReason),
}

impl TriggerDecision {
    pub fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Triggered(r) => r.code(),
            Self::Suppressed(r) => r.code(),
        }
    }
}

/// Trigger state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Idle,
    Evaluating,
    Triggered(TriggerReason),
    Suppressed(SuppressReason),
}

impl From<TriggerDecision> for TriggerState {
    fn from(decision: TriggerDecision) -> Self {
        match decision {
            TriggerDecision::Triggered(r) => Self::Triggered(r),
            TriggerDecision::Suppressed(r) => Self::Suppressed(r),
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Evaluating => write!(f, "evaluating"),
            Self::Triggered(r) => write!(f, "triggered({})", r.code()),
            Self::Suppressed(r) => write!(f, "suppressed({})", r.code()),
        }
    }
}

/// Pure trigger rule.
pub fn should_rebalance(
    efficiency: u64,
    time_since_last: u64,
    volatility_change: u64,
    cooldown_seconds: u64,
) -> TriggerDecision {
    if time_since_last < cooldown_seconds {
        return TriggerDecision::Suppressed(SuppressReason::Cooldown);
    }
    if efficiency < POOR_EFFICIENCY_THRESHOLD {
        return TriggerDecision::Triggered(TriggerReason::PoorEfficiency);
    }
    if volatility_change > VOLATILITY_SHIFT_THRESHOLD {
        return TriggerDecision::Triggered(TriggerReason::VolatilityShift);
    }
    if time_since_last > STALE_AFTER_SECS {
        return TriggerDecision::Triggered(TriggerReason::Stale);
    }
    TriggerDecision::Suppressed(SuppressReason::NoCondition)
}

/// Rebalance bookkeeping.
///
/// `total` counts attempts: `total == successful + failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RebalanceHistory {
    /// `None` until the first completed rebalance.
    pub last_rebalance_at: Option<u64>,
    /// Volatility recorded at the last completed rebalance.
    pub last_trigger_volatility: u64,
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    /// Sum of efficiency gains (bps) over successful rebalances.
    pub total_efficiency_gain: i64,
}

impl RebalanceHistory {
    /// Mean efficiency gain per successful rebalance.
    pub fn average_efficiency_gain(&self) -> i64 {
        if self.successful == 0 {
            return 0;
        }
        self.total_efficiency_gain / self.successful as i64
    }
}

/// Stateful trigger: owns the state machine and history for one pool.
#[derive(Debug, Clone)]
pub struct RebalanceTrigger {
    cooldown_seconds: u64,
    state: TriggerState,
    history: RebalanceHistory,
}

impl RebalanceTrigger {
    /// `baseline_volatility` is the reference for volatility-change checks
    /// until the first rebalance completes.
    pub fn new(cooldown_seconds: u64, baseline_volatility: u64) -> Self {
        Self {
            cooldown_seconds,
            state: TriggerState::Idle,
            history: RebalanceHistory {
                last_trigger_volatility: baseline_volatility,
                ..Default::default()
            },
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn history(&self) -> &RebalanceHistory {
        &self.history
    }

    /// Seconds since the last completed rebalance; unbounded if none.
    pub fn time_since_last(&self, now: u64) -> u64 {
        self.history
            .last_rebalance_at
            .map_or(u64::MAX, |t| now.saturating_sub(t))
    }

    pub fn cooldown_remaining(&self, now: u64) -> u64 {
        self.cooldown_seconds
            .saturating_sub(self.time_since_last(now))
    }

    pub fn volatility_change(&self, volatility: u64) -> u64 {
        volatility.abs_diff(self.history.last_trigger_volatility)
    }

    /// Enter `Evaluating`, returning the state to restore if evaluation aborts.
    pub fn begin(&mut self) -> TriggerState {
        std::mem::replace(&mut self.state, TriggerState::Evaluating)
    }

    pub fn restore(&mut self, state: TriggerState) {
        self.state = state;
    }

    /// Run the rule for the current inputs without settling the state.
    pub fn decide(&self, efficiency: u64, now: u64, volatility: u64) -> TriggerDecision {
        should_rebalance(
            efficiency,
            self.time_since_last(now),
            self.volatility_change(volatility),
            self.cooldown_seconds,
        )
    }

    pub fn settle(&mut self, decision: TriggerDecision) {
        self.state = decision.into();
    }

    /// A proposal failed validation: count it, keep the cooldown as is.
    pub fn record_failure(&mut self) {
        self.history.failed += 1;
        self.history.total += 1;
        self.state = TriggerState::Idle;
    }

    pub fn mark_rebalance_completed(&mut self, now: u64, volatility: u64, efficiency_gain: i64) {
        self.history.last_rebalance_at = Some(now);
        self.history.last_trigger_volatility = volatility;
        self.history.successful += 1;
        self.history.total += 1;
        self.history.total_efficiency_gain =
            self.history.total_efficiency_gain.saturating_add(efficiency_gain);
        self.state = TriggerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_rebalance_cases() {
        let cases = [
            (8_000, 100, 5_000, TriggerDecision::Suppressed(SuppressReason::Cooldown)),
            (3_000, 400, 5_000, TriggerDecision::Triggered(TriggerReason::PoorEfficiency)),
            (8_000, 400, 25_000, TriggerDecision::Triggered(TriggerReason::VolatilityShift)),
            (8_000, 4_000, 5_000, TriggerDecision::Triggered(TriggerReason::Stale)),
            (8_000, 400, 5_000, TriggerDecision::Suppressed(SuppressReason::NoCondition)),
        ];
        for (eff, since, vol_change, expected) in cases {
            assert_eq!(
                should_rebalance(eff, since, vol_change, 300),
                expected,
                "eff={eff} since={since} vol_change={vol_change}"
            );
        }
    }

    #[test]
    fn test_threshold_edges() {
        assert!(!should_rebalance(6_000, 400, 0, 300).is_triggered());
        assert!(should_rebalance(5_999, 400, 0, 300).is_triggered());
        assert!(!should_rebalance(8_000, 400, 20_000, 300).is_triggered());
        assert!(!should_rebalance(8_000, 3_600, 0, 300).is_triggered());
        assert!(should_rebalance(8_000, 3_601, 0, 300).is_triggered());
        // cooldown wins over everything
        assert_eq!(
            should_rebalance(0, 299, 1_000_000, 300),
            TriggerDecision::Suppressed(SuppressReason::Cooldown)
        );
        assert!(should_rebalance(0, 300, 0, 300).is_triggered());
    }

    #[test]
    fn test_never_rebalanced_has_no_cooldown() {
        let trigger = RebalanceTrigger::new(300, 0);
        assert_eq!(trigger.time_since_last(0), u64::MAX);
        assert_eq!(trigger.cooldown_remaining(0), 0);
        // Stale fires on an engine that has never rebalanced.
        assert_eq!(
            trigger.decide(9_000, 0, 0),
            TriggerDecision::Triggered(TriggerReason::Stale)
        );
    }

    #[test]
    fn test_state_transitions() {
        let mut trigger = RebalanceTrigger::new(300, 0);
        assert_eq!(trigger.state(), TriggerState::Idle);

        let previous = trigger.begin();
        assert_eq!(previous, TriggerState::Idle);
        assert_eq!(trigger.state(), TriggerState::Evaluating);

        let decision = trigger.decide(1_000, 10, 0);
        trigger.settle(decision);
        assert_eq!(
            trigger.state(),
            TriggerState::Triggered(TriggerReason::PoorEfficiency)
        );

        trigger.mark_rebalance_completed(10, 45_000, 2_500);
        assert_eq!(trigger.state(), TriggerState::Idle);
        assert_eq!(trigger.cooldown_remaining(110), 200);
        assert_eq!(trigger.volatility_change(50_000), 5_000);

        trigger.begin();
        trigger.settle(trigger.decide(1_000, 110, 45_000));
        assert_eq!(
            trigger.state(),
            TriggerState::Suppressed(SuppressReason::Cooldown)
        );
    }

    #[test]
    fn test_failure_does_not_reset_cooldown() {
        let mut trigger = RebalanceTrigger::new(300, 0);
        trigger.mark_rebalance_completed(1_000, 0, 100);
        trigger.record_failure();
        let h = trigger.history();
        assert_eq!((h.total, h.successful, h.failed), (2, 1, 1));
        assert_eq!(h.last_rebalance_at, Some(1_000));
        assert_eq!(trigger.cooldown_remaining(1_100), 200);
    }

    #[test]
    fn test_average_efficiency_gain() {
        let mut trigger = RebalanceTrigger::new(300, 0);
        assert_eq!(trigger.history().average_efficiency_gain(), 0);
        trigger.mark_rebalance_completed(0, 0, 300);
        trigger.mark_rebalance_completed(400, 0, 100);
        trigger.record_failure();
        assert_eq!(trigger.history().average_efficiency_gain(), 200);
        assert_eq!(trigger.history().total_efficiency_gain, 400);
    }

    #[test]
    fn test_restore_after_abort() {
        let mut trigger = RebalanceTrigger::new(300, 0);
        trigger.settle(TriggerDecision::Suppressed(SuppressReason::NoCondition));
        let previous = trigger.begin();
        trigger.restore(previous);
        assert_eq!(
            trigger.state(),
            TriggerState::Suppressed(SuppressReason::NoCondition)
        );
        assert_eq!(trigger.state().to_string(), "suppressed(NO_TRIGGER_CONDITION)");
    }
}
