//! Engine outputs: decisions, proposals, status reports.

use chrono::{DateTime, Utc};
use seltra_core::{Price, RangeSet, Regime};
use serde::Serialize;
use std::fmt;

use crate::trigger::TriggerState;

/// Coarse outcome of an evaluation, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// New ranges proposed and validated.
    Rebalance,
    /// Trigger conditions not met.
    Hold,
    /// Triggered, but the proposal failed safety validation.
    Rejected,
}

impl DecisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rebalance => "rebalance",
            Self::Hold => "hold",
            Self::Rejected => "rejected",
        }
    }
}

/// Result of one engine evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceDecision {
    /// Unique decision ID for tracking.
    pub decision_id: String,
    /// Whether the pool should apply `proposed_ranges`.
    pub trigger: bool,
    pub outcome: DecisionOutcome,
    /// Stable reason code, e.g. `POOR_EFFICIENCY` or `UNSAFE:RANGE_TOO_SMALL`.
    pub reason: String,
    pub proposed_ranges: Option<RangeSet>,
    pub regime: Regime,
    /// Volatility (1e6 scale) the decision was made with.
    pub volatility: u64,
    /// Efficiency of the current ranges (1e4 scale).
    pub efficiency_score: u64,
    /// Efficiency of the proposed ranges, when there are any.
    pub proposed_efficiency: Option<u64>,
    pub price: Price,
    pub decided_at: DateTime<Utc>,
}

impl RebalanceDecision {
    /// Efficiency gain the proposal would bring, in bps.
    pub fn efficiency_gain(&self) -> Option<i64> {
        self.proposed_efficiency
            .map(|p| p as i64 - self.efficiency_score as i64)
    }
}

/// An (old, new) transition with the market snapshot it was built for.
#[derive(Debug, Clone)]
pub struct RebalanceProposal {
    pub current_ranges: RangeSet,
    pub proposed_ranges: RangeSet,
    pub price: Price,
    pub volatility: u64,
}

/// Efficiency comparison for an accepted proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProposalAssessment {
    pub current_efficiency: u64,
    pub proposed_efficiency: u64,
    pub efficiency_gain: i64,
}

/// Engine counters and current market view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub total_rebalances: u64,
    pub successful_rebalances: u64,
    pub failed_rebalances: u64,
    pub average_efficiency_gain: i64,
    pub cooldown_remaining: u64,
    pub volatility: u64,
    pub regime: Regime,
    #[serde(serialize_with = "serialize_display")]
    pub state: TriggerState,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} successful={} failed={} avg_gain={}bps cooldown={}s volatility={} regime={} state={}",
            self.total_rebalances,
            self.successful_rebalances,
            self.failed_rebalances,
            self.average_efficiency_gain,
            self.cooldown_remaining,
            self.volatility,
            self.regime,
            self.state
        )
    }
}

/// Configured limits plus oracle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalancingParams {
    pub max_slippage_bps: u64,
    pub cooldown_seconds: u64,
    pub min_range_size_bps: u64,
    pub alpha: u64,
    pub window_size: usize,
}

impl fmt::Display for RebalancingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_slippage={}bp cooldown={}s min_range={}bp alpha={} window={}",
            self.max_slippage_bps,
            self.cooldown_seconds,
            self.min_range_size_bps,
            self.alpha,
            self.window_size
        )
    }
}

fn serialize_display<T: fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{SuppressReason, TriggerReason};

    fn status(state: TriggerState) -> EngineStatus {
        EngineStatus {
            total_rebalances: 3,
            successful_rebalances: 2,
            failed_rebalances: 1,
            average_efficiency_gain: 1_250,
            cooldown_remaining: 0,
            volatility: 45_000,
            regime: Regime::Medium,
            state,
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            status(TriggerState::Idle).to_string(),
            "total=3 successful=2 failed=1 avg_gain=1250bps cooldown=0s volatility=45000 regime=medium state=idle"
        );
    }

    #[test]
    fn test_status_serializes_state_as_text() {
        let json = serde_json::to_value(status(TriggerState::Triggered(TriggerReason::Stale))).unwrap();
        assert_eq!(json["state"], "triggered(STALE)");
        assert_eq!(json["regime"], "medium");

        let json = serde_json::to_value(status(TriggerState::Suppressed(SuppressReason::Cooldown))).unwrap();
        assert_eq!(json["state"], "suppressed(COOLDOWN_ACTIVE)");
    }

    #[test]
    fn test_decision_efficiency_gain() {
        let mut decision = RebalanceDecision {
            decision_id: "d-1".to_string(),
            trigger: true,
            outcome: DecisionOutcome::Rebalance,
            reason: "POOR_EFFICIENCY".to_string(),
            proposed_ranges: Some(RangeSet::empty()),
            regime: Regime::Low,
            volatility: 20_000,
            efficiency_score: 4_000,
            proposed_efficiency: Some(9_100),
            price: Price::ONE,
            decided_at: Utc::now(),
        };
        assert_eq!(decision.efficiency_gain(), Some(5_100));

        decision.proposed_efficiency = None;
        assert_eq!(decision.efficiency_gain(), None);

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["outcome"], "rebalance");
        assert_eq!(json["price"], "1000000000000000000");
    }
}
