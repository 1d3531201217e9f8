//! Per-pool rebalancing engine.
//!
//! `RebalanceEngine` ties the volatility oracle, regime table, allocator,
//! scorer, safety validator and trigger together. One instance serves one
//! pool; calls are applied in the order they are made.
//!
//! Every operation checks its inputs before touching state, so an `Err`
//! return leaves the engine exactly as it was (except for the failure
//! counter, which exists to record rejected proposals).

use chrono::Utc;
use seltra_core::{
    classify, EngineError, EngineResult, Price, PriceObservation, RangeSet, Regime,
    RegimeProfile, UnsafeReason,
};
use seltra_oracle::{OracleConfig, VolatilityEstimator, VolatilityState};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocator::allocate;
use crate::config::EngineConfig;
use crate::decision::{
    DecisionOutcome, EngineStatus, ProposalAssessment, RebalanceDecision, RebalanceProposal,
    RebalancingParams,
};
use crate::scorer::score;
use crate::trigger::{RebalanceHistory, RebalanceTrigger, TriggerDecision, TriggerState};
use crate::validator::{validate, validate_initial, ValidationResult};

/// Smallest efficiency improvement (bps) worth a rebalance: 1%.
pub const MIN_EFFICIENCY_GAIN: i64 = 100;

/// Explicit per-pool engine state.
#[derive(Debug)]
pub struct RebalanceEngine {
    config: EngineConfig,
    oracle_config: OracleConfig,
    estimator: VolatilityEstimator,
    trigger: RebalanceTrigger,
    /// Latest timestamp seen by any operation.
    last_seen: u64,
}

impl RebalanceEngine {
    /// Validate configuration and seed the oracle with the first price.
    pub fn initialize(
        config: EngineConfig,
        oracle_config: OracleConfig,
        initial_price: Price,
        now: u64,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        let initial = PriceObservation::new(initial_price, now)?;
        let estimator = VolatilityEstimator::with_config(&oracle_config, initial)?;
        let trigger = RebalanceTrigger::new(config.cooldown_seconds, estimator.volatility()?);

        info!(
            initial_price = %initial_price,
            cooldown_seconds = config.cooldown_seconds,
            min_range_size_bps = config.min_range_size_bps,
            "Rebalance engine initialized"
        );

        Ok(Self {
            config,
            oracle_config,
            estimator,
            trigger,
            last_seen: now,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feed a price tick into the volatility oracle.
    pub fn on_price(&mut self, obs: PriceObservation) -> EngineResult<u64> {
        self.check_clock(obs.observed_at)?;
        let volatility = self.estimator.update(obs)?;
        self.last_seen = obs.observed_at;
        Ok(volatility)
    }

    /// Regime profile and ranges for a price/volatility pair.
    pub fn calculate_optimal_ranges(
        &self,
        price: Price,
        volatility: u64,
        total_liquidity: u128,
    ) -> EngineResult<(RegimeProfile, RangeSet)> {
        let profile = classify(volatility);
        let ranges = allocate(
            price,
            profile.concentration_factor,
            profile.range_count,
            total_liquidity,
        )?;
        Ok((profile, ranges))
    }

    /// Decide whether the pool should move from `current_ranges` to a new set.
    ///
    /// A triggered evaluation whose proposal fails safety validation counts
    /// as a failed rebalance and returns a non-triggering decision.
    pub fn evaluate(
        &mut self,
        price: Price,
        total_liquidity: u128,
        current_ranges: &RangeSet,
        now: u64,
    ) -> EngineResult<RebalanceDecision> {
        self.check_clock(now)?;
        if price.is_zero() {
            return Err(EngineError::InvalidInput("price must be positive".to_string()));
        }

        let previous = self.trigger.begin();
        let result = self.run_evaluation(price, total_liquidity, current_ranges, now);
        match &result {
            Ok(_) => self.last_seen = now,
            Err(_) => self.trigger.restore(previous),
        }
        result
    }

    fn run_evaluation(
        &mut self,
        price: Price,
        total_liquidity: u128,
        current_ranges: &RangeSet,
        now: u64,
    ) -> EngineResult<RebalanceDecision> {
        let volatility = self.estimator.volatility()?;
        let profile = classify(volatility);
        let efficiency = score(current_ranges, price, volatility);
        let decision = self.trigger.decide(efficiency, now, volatility);

        let mut out = RebalanceDecision {
            decision_id: Uuid::new_v4().to_string(),
            trigger: false,
            outcome: DecisionOutcome::Hold,
            reason: decision.code().to_string(),
            proposed_ranges: None,
            regime: profile.regime,
            volatility,
            efficiency_score: efficiency,
            proposed_efficiency: None,
            price,
            decided_at: Utc::now(),
        };

        let TriggerDecision::Triggered(reason) = decision else {
            debug!(
                efficiency,
                volatility,
                reason = decision.code(),
                "Rebalance suppressed"
            );
            self.trigger.settle(decision);
            return Ok(out);
        };

        let (_, proposed) = self.calculate_optimal_ranges(price, volatility, total_liquidity)?;
        let proposed_efficiency = score(&proposed, price, volatility);
        out.proposed_efficiency = Some(proposed_efficiency);

        match self.check_safety(current_ranges, &proposed) {
            Ok(()) => {
                info!(
                    decision_id = %out.decision_id,
                    reason = reason.code(),
                    regime = %profile.regime,
                    volatility,
                    efficiency,
                    proposed_efficiency,
                    ranges = %proposed,
                    "Rebalance triggered"
                );
                self.trigger.settle(decision);
                out.trigger = true;
                out.outcome = DecisionOutcome::Rebalance;
                out.proposed_ranges = Some(proposed);
            }
            Err(unsafe_reason) => {
                warn!(
                    decision_id = %out.decision_id,
                    trigger_reason = reason.code(),
                    unsafe_reason = %unsafe_reason,
                    "Proposed ranges failed validation"
                );
                self.trigger.record_failure();
                out.outcome = DecisionOutcome::Rejected;
                out.reason = format!("UNSAFE:{}", unsafe_reason.code());
            }
        }
        Ok(out)
    }

    /// Check a proposal for safety and a worthwhile efficiency gain.
    pub fn validate_proposal(&self, proposal: &RebalanceProposal) -> EngineResult<ProposalAssessment> {
        self.check_safety(&proposal.current_ranges, &proposal.proposed_ranges)?;
        let assessment = assess(proposal);
        if assessment.efficiency_gain < MIN_EFFICIENCY_GAIN {
            return Err(EngineError::InsufficientGain {
                gain: assessment.efficiency_gain,
            });
        }
        Ok(assessment)
    }

    /// Safety report for a transition the pool is about to make.
    ///
    /// Read-only: unlike `execute_rebalance`, a failure here is not counted.
    pub fn validate_transition(&self, current: &RangeSet, proposed: &RangeSet) -> ValidationResult {
        self.check_safety(current, proposed).into()
    }

    /// Apply a transition on behalf of `caller`.
    ///
    /// Refuses unauthorized callers and calls inside the cooldown. A
    /// transition that fails validation is counted as a failed rebalance.
    pub fn execute_rebalance(
        &mut self,
        caller: &str,
        current_ranges: &RangeSet,
        new_ranges: &RangeSet,
        price: Price,
        now: u64,
    ) -> EngineResult<ProposalAssessment> {
        if caller != self.config.authorized_caller {
            warn!(caller, "Unauthorized rebalance attempt");
            return Err(EngineError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        self.check_clock(now)?;
        let remaining = self.trigger.cooldown_remaining(now);
        if remaining > 0 {
            return Err(EngineError::CooldownActive {
                remaining_secs: remaining,
            });
        }

        let volatility = self.estimator.volatility()?;
        if let Err(reason) = self.check_safety(current_ranges, new_ranges) {
            warn!(unsafe_reason = %reason, "Rebalance execution rejected");
            self.trigger.record_failure();
            return Err(reason.into());
        }

        let assessment = assess(&RebalanceProposal {
            current_ranges: current_ranges.clone(),
            proposed_ranges: new_ranges.clone(),
            price,
            volatility,
        });
        self.complete(now, volatility, assessment.efficiency_gain);
        self.last_seen = now;
        Ok(assessment)
    }

    /// Record that the pool applied a proposal at `now`.
    pub fn mark_rebalance_completed(&mut self, now: u64, efficiency_gain: i64) -> EngineResult<()> {
        self.check_clock(now)?;
        let volatility = self.estimator.volatility()?;
        self.complete(now, volatility, efficiency_gain);
        self.last_seen = now;
        Ok(())
    }

    fn complete(&mut self, now: u64, volatility: u64, efficiency_gain: i64) {
        self.trigger
            .mark_rebalance_completed(now, volatility, efficiency_gain);
        let history = self.trigger.history();
        info!(
            at = now,
            volatility,
            efficiency_gain,
            successful = history.successful,
            "Rebalance completed"
        );
    }

    pub fn get_volatility(&self) -> EngineResult<u64> {
        self.estimator.volatility()
    }

    pub fn get_regime(&self) -> EngineResult<Regime> {
        self.estimator.regime()
    }

    pub fn volatility_state(&self) -> EngineResult<&VolatilityState> {
        self.estimator.state()
    }

    pub fn history(&self) -> &RebalanceHistory {
        self.trigger.history()
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.trigger.state()
    }

    pub fn get_engine_status(&self, now: u64) -> EngineResult<EngineStatus> {
        let state = self.estimator.state()?;
        let history = self.trigger.history();
        Ok(EngineStatus {
            total_rebalances: history.total,
            successful_rebalances: history.successful,
            failed_rebalances: history.failed,
            average_efficiency_gain: history.average_efficiency_gain(),
            cooldown_remaining: self.trigger.cooldown_remaining(now),
            volatility: state.current_volatility,
            regime: state.regime,
            state: self.trigger.state(),
        })
    }

    pub fn rebalancing_params(&self) -> RebalancingParams {
        RebalancingParams {
            max_slippage_bps: self.config.max_slippage_bps,
            cooldown_seconds: self.config.cooldown_seconds,
            min_range_size_bps: self.config.min_range_size_bps,
            alpha: self.oracle_config.alpha,
            window_size: self.oracle_config.window_size,
        }
    }

    fn check_clock(&self, now: u64) -> EngineResult<()> {
        if now < self.last_seen {
            return Err(EngineError::InvalidInput(format!(
                "timestamp regressed: {now} < {}",
                self.last_seen
            )));
        }
        Ok(())
    }

    /// First placements have nothing to conserve against.
    fn check_safety(&self, current: &RangeSet, proposed: &RangeSet) -> Result<(), UnsafeReason> {
        if current.is_unfunded() {
            validate_initial(proposed, self.config.min_range_size_bps)
        } else {
            validate(current, proposed, self.config.min_range_size_bps)
        }
    }
}

fn assess(proposal: &RebalanceProposal) -> ProposalAssessment {
    let current_efficiency = score(&proposal.current_ranges, proposal.price, proposal.volatility);
    let proposed_efficiency = score(&proposal.proposed_ranges, proposal.price, proposal.volatility);
    ProposalAssessment {
        current_efficiency,
        proposed_efficiency,
        efficiency_gain: proposed_efficiency as i64 - current_efficiency as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{SuppressReason, TriggerReason};
    use seltra_core::{LiquidityRange, PRICE_SCALE};

    const TOTAL: u128 = 1_000_000;

    fn engine() -> RebalanceEngine {
        RebalanceEngine::initialize(
            EngineConfig::default(),
            OracleConfig::default(),
            Price::from_units(100),
            0,
        )
        .unwrap()
    }

    fn tick(engine: &mut RebalanceEngine, units: u64, at: u64) -> u64 {
        engine
            .on_price(PriceObservation::new(Price::from_units(units), at).unwrap())
            .unwrap()
    }

    fn set(ranges: &[(u64, u64, u128)]) -> RangeSet {
        RangeSet::new(
            ranges
                .iter()
                .map(|&(lo, hi, liq)| {
                    LiquidityRange::new(Price::from_units(lo), Price::from_units(hi), liq)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_initialize_rejects_bad_config() {
        let bad = EngineConfig {
            cooldown_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            RebalanceEngine::initialize(bad, OracleConfig::default(), Price::ONE, 0),
            Err(EngineError::InvalidConfig(_))
        ));
        let bad_oracle = OracleConfig {
            alpha: 0,
            ..Default::default()
        };
        assert!(matches!(
            RebalanceEngine::initialize(EngineConfig::default(), bad_oracle, Price::ONE, 0),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(matches!(
            RebalanceEngine::initialize(EngineConfig::default(), OracleConfig::default(), Price::ZERO, 0),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fresh_engine_reports_zero_volatility() {
        let e = engine();
        assert_eq!(e.get_volatility().unwrap(), 0);
        assert_eq!(e.get_regime().unwrap(), Regime::UltraLow);
        let status = e.get_engine_status(0).unwrap();
        assert_eq!(status.total_rebalances, 0);
        assert_eq!(status.cooldown_remaining, 0);
    }

    #[test]
    fn test_calculate_optimal_ranges_end_to_end() {
        let e = engine();
        let price = Price::from_units(100);
        for (vol, regime, factor, count) in [
            (5_000, Regime::UltraLow, 4_000, 2),
            (45_000, Regime::Medium, 10_000, 4),
            (150_000, Regime::Extreme, 25_000, 6),
        ] {
            let (profile, ranges) = e.calculate_optimal_ranges(price, vol, TOTAL).unwrap();
            assert_eq!(profile.regime, regime);
            assert_eq!(profile.concentration_factor, factor);
            assert_eq!(ranges.len(), count);
            assert_eq!(ranges.total_liquidity(), TOTAL);
        }
    }

    #[test]
    fn test_first_evaluation_places_initial_ranges() {
        let mut e = engine();
        let decision = e
            .evaluate(Price::from_units(100), TOTAL, &RangeSet::empty(), 10)
            .unwrap();
        assert!(decision.trigger);
        assert_eq!(decision.outcome, DecisionOutcome::Rebalance);
        assert_eq!(decision.reason, "POOR_EFFICIENCY");
        assert_eq!(decision.efficiency_score, 0);
        let ranges = decision.proposed_ranges.as_ref().unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges.total_liquidity(), TOTAL);
        assert_eq!(
            e.trigger_state(),
            TriggerState::Triggered(TriggerReason::PoorEfficiency)
        );
    }

    #[test]
    fn test_cooldown_after_completion() {
        let mut e = engine();
        let decision = e
            .evaluate(Price::from_units(100), TOTAL, &RangeSet::empty(), 10)
            .unwrap();
        let applied = decision.proposed_ranges.clone().unwrap();
        e.mark_rebalance_completed(10, decision.efficiency_gain().unwrap())
            .unwrap();
        assert_eq!(e.trigger_state(), TriggerState::Idle);

        // Far from the ranges, but still inside the cooldown.
        let decision = e
            .evaluate(Price::from_units(300), TOTAL, &applied, 100)
            .unwrap();
        assert!(!decision.trigger);
        assert_eq!(decision.reason, "COOLDOWN_ACTIVE");
        assert_eq!(
            e.trigger_state(),
            TriggerState::Suppressed(SuppressReason::Cooldown)
        );
        assert_eq!(e.get_engine_status(100).unwrap().cooldown_remaining, 210);
    }

    #[test]
    fn test_unsafe_proposal_counts_failure() {
        let mut e = engine();
        // Deployed liquidity differs from the total handed to the allocator.
        let current = set(&[(10, 20, 5_000)]);
        let decision = e
            .evaluate(Price::from_units(100), TOTAL, &current, 10)
            .unwrap();
        assert!(!decision.trigger);
        assert_eq!(decision.outcome, DecisionOutcome::Rejected);
        assert_eq!(decision.reason, "UNSAFE:LIQUIDITY_NOT_CONSERVED");
        assert!(decision.proposed_ranges.is_none());

        let history = e.history();
        assert_eq!((history.total, history.successful, history.failed), (1, 0, 1));
        assert_eq!(history.last_rebalance_at, None);
        assert_eq!(e.trigger_state(), TriggerState::Idle);
    }

    #[test]
    fn test_evaluate_error_leaves_state_untouched() {
        let mut e = engine();
        e.evaluate(Price::from_units(100), TOTAL, &RangeSet::empty(), 5)
            .unwrap();
        let state = e.trigger_state();

        // Zero total liquidity cannot be allocated.
        assert!(matches!(
            e.evaluate(Price::from_units(100), 0, &RangeSet::empty(), 6),
            Err(EngineError::InvalidInput(_))
        ));
        assert_eq!(e.trigger_state(), state);
        assert_eq!(e.history().total, 0);

        assert!(matches!(
            e.evaluate(Price::from_units(100), TOTAL, &RangeSet::empty(), 4),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_volatility_shift_triggers_after_cooldown() {
        let mut e = engine();
        let decision = e
            .evaluate(Price::from_units(100), TOTAL, &RangeSet::empty(), 1)
            .unwrap();
        let applied = decision.proposed_ranges.unwrap();
        e.mark_rebalance_completed(1, 0).unwrap();

        // Price stays inside the band; volatility jumps.
        tick(&mut e, 110, 400);
        let vol = tick(&mut e, 100, 401);
        assert!(vol > 20_000);

        let decision = e
            .evaluate(Price::from_units(100), TOTAL, &applied, 402)
            .unwrap();
        assert!(decision.efficiency_score >= 6_000, "{}", decision.efficiency_score);
        assert_eq!(decision.reason, "VOLATILITY_SHIFT");
        assert!(decision.trigger);
    }

    #[test]
    fn test_on_price_rejects_regressing_clock() {
        let mut e = engine();
        tick(&mut e, 101, 50);
        let before = *e.volatility_state().unwrap();
        let stale = PriceObservation::new(Price::from_units(150), 49).unwrap();
        assert!(matches!(e.on_price(stale), Err(EngineError::InvalidInput(_))));
        assert_eq!(*e.volatility_state().unwrap(), before);
    }

    #[test]
    fn test_validate_proposal_requires_gain() {
        let e = engine();
        let price = Price::from_units(100);
        let (_, good) = e.calculate_optimal_ranges(price, 0, TOTAL).unwrap();
        let far = set(&[(10, 20, TOTAL)]);

        // mrd = 100 units: good scores 9_000, far scores 5_750.
        let assessment = e
            .validate_proposal(&RebalanceProposal {
                current_ranges: far.clone(),
                proposed_ranges: good.clone(),
                price,
                volatility: 5_000,
            })
            .unwrap();
        assert_eq!(assessment.current_efficiency, 5_750);
        assert_eq!(assessment.proposed_efficiency, 9_000);
        assert_eq!(assessment.efficiency_gain, 3_250);

        // Same ranges: zero gain.
        assert!(matches!(
            e.validate_proposal(&RebalanceProposal {
                current_ranges: good.clone(),
                proposed_ranges: good.clone(),
                price,
                volatility: 5_000,
            }),
            Err(EngineError::InsufficientGain { gain: 0 })
        ));

        // Unsafe beats gain.
        let shrunk = set(&[(95, 105, TOTAL / 2)]);
        assert!(matches!(
            e.validate_proposal(&RebalanceProposal {
                current_ranges: far,
                proposed_ranges: shrunk,
                price,
                volatility: 0,
            }),
            Err(EngineError::Unsafe(UnsafeReason::LiquidityNotConserved { .. }))
        ));
    }

    #[test]
    fn test_validate_transition_reports_without_counting() {
        let e = engine();
        let price = Price::from_units(100);
        let (_, proposed) = e.calculate_optimal_ranges(price, 0, TOTAL).unwrap();

        let ok = e.validate_transition(&RangeSet::empty(), &proposed);
        assert!(ok.ok);
        assert_eq!(ok.reason, None);

        let drifted = set(&[(10, 20, TOTAL / 2)]);
        let failed = e.validate_transition(&drifted, &proposed);
        assert!(!failed.ok);
        assert_eq!(failed.reason.as_deref(), Some("LIQUIDITY_NOT_CONSERVED"));
        assert_eq!(failed.range_index, None);

        let narrow = set(&[(1_000, 1_002, TOTAL)]);
        let failed = e.validate_transition(&RangeSet::empty(), &narrow);
        assert_eq!(failed.reason.as_deref(), Some("RANGE_TOO_SMALL"));
        assert_eq!(failed.range_index, Some(0));

        assert_eq!(e.history().failed, 0);
    }

    #[test]
    fn test_execute_rebalance_guards() {
        let mut e = engine();
        tick(&mut e, 101, 1);
        let price = Price::from_units(100);
        let current = set(&[(10, 20, TOTAL)]);
        let (_, proposed) = e.calculate_optimal_ranges(price, 0, TOTAL).unwrap();

        assert!(matches!(
            e.execute_rebalance("mallory", &current, &proposed, price, 10),
            Err(EngineError::Unauthorized { .. })
        ));

        let bad = set(&[(95, 105, TOTAL / 2)]);
        assert!(matches!(
            e.execute_rebalance("operator", &current, &bad, price, 10),
            Err(EngineError::Unsafe(_))
        ));
        assert_eq!(e.history().failed, 1);
        // Failure does not start a cooldown.
        let assessment = e
            .execute_rebalance("operator", &current, &proposed, price, 10)
            .unwrap();
        assert!(assessment.efficiency_gain > 0);
        assert_eq!(e.history().successful, 1);

        assert!(matches!(
            e.execute_rebalance("operator", &proposed, &current, price, 100),
            Err(EngineError::CooldownActive { remaining_secs: 210 })
        ));

        let status = e.get_engine_status(100).unwrap();
        assert_eq!(status.total_rebalances, 2);
        assert_eq!(status.failed_rebalances, 1);
        assert_eq!(status.average_efficiency_gain, assessment.efficiency_gain);
    }

    #[test]
    fn test_params_report() {
        let e = engine();
        let params = e.rebalancing_params();
        assert_eq!(params.max_slippage_bps, 100);
        assert_eq!(params.cooldown_seconds, 300);
        assert_eq!(params.min_range_size_bps, 50);
        assert_eq!(params.alpha, 300_000);
        assert_eq!(
            params.to_string(),
            "max_slippage=100bp cooldown=300s min_range=50bp alpha=300000 window=10"
        );
        assert_eq!(PRICE_SCALE, Price::ONE.raw());
    }
}
