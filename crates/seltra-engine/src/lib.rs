//! Volatility-adaptive liquidity rebalancing engine.
//!
//! Decides what liquidity configuration a pool should hold and whether a
//! change is warranted:
//! - `allocate`: spread liquidity over regime-sized ranges around the price
//! - `score`: capital efficiency of a range set (0..=10_000)
//! - `validate`: safety checks on an (old, new) transition
//! - `RebalanceTrigger`: cooldown / efficiency / volatility-shift / staleness rules
//! - `RebalanceEngine`: per-pool state tying the above to the volatility oracle
//!
//! Applying a decision is the caller's job; the engine only records that it
//! happened via `mark_rebalance_completed` or `execute_rebalance`.

pub mod allocator;
pub mod config;
pub mod decision;
pub mod engine;
pub mod scorer;
pub mod trigger;
pub mod validator;

pub use allocator::allocate;
pub use config::EngineConfig;
pub use decision::{
    DecisionOutcome, EngineStatus, ProposalAssessment, RebalanceDecision, RebalanceProposal,
    RebalancingParams,
};
pub use engine::{RebalanceEngine, MIN_EFFICIENCY_GAIN};
pub use scorer::{score, MAX_SCORE};
pub use trigger::{
    should_rebalance, RebalanceHistory, RebalanceTrigger, SuppressReason, TriggerDecision,
    TriggerReason, TriggerState,
};
pub use validator::{validate, validate_initial, ValidationResult};
