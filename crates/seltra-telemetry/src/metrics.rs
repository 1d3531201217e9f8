//! Prometheus metrics for the rebalancing service.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate or malformed metric name, which is a startup bug; it can only
//! happen during static initialization, never while handling ticks.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Price ticks accepted per pool.
pub static PRICE_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "seltra_price_updates_total",
        "Total price ticks accepted",
        &["pool"]
    )
    .unwrap()
});

/// Price ticks rejected per pool.
/// Labels: pool, reason (invalid_input/not_initialized/unknown_pool/parse)
pub static PRICE_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "seltra_price_rejected_total",
        "Total price ticks rejected",
        &["pool", "reason"]
    )
    .unwrap()
});

/// Current volatility (1e6 scale).
pub static VOLATILITY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "seltra_volatility",
        "Current EWMA volatility (1e6 scale)",
        &["pool"]
    )
    .unwrap()
});

/// Current regime ordinal (0=ultra_low .. 4=extreme).
pub static REGIME: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "seltra_regime",
        "Current volatility regime (0=ultra_low, 4=extreme)",
        &["pool"]
    )
    .unwrap()
});

/// Efficiency score of the deployed ranges (0..10000).
pub static EFFICIENCY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "seltra_efficiency_score",
        "Capital efficiency of deployed ranges (0-10000)",
        &["pool"]
    )
    .unwrap()
});

/// Engine decisions.
/// Labels: pool, outcome (rebalance/hold/rejected), reason
pub static DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "seltra_decisions_total",
        "Total rebalance decisions",
        &["pool", "outcome", "reason"]
    )
    .unwrap()
});

/// Proposals rejected by safety validation.
pub static VALIDATION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "seltra_validation_failures_total",
        "Total proposals rejected by safety validation",
        &["pool", "reason"]
    )
    .unwrap()
});

/// Rebalances applied.
pub static REBALANCES_APPLIED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "seltra_rebalances_applied_total",
        "Total rebalances applied to pools",
        &["pool"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn price_accepted(pool: &str, volatility: u64, regime_ordinal: u8) {
        PRICE_UPDATES_TOTAL.with_label_values(&[pool]).inc();
        VOLATILITY.with_label_values(&[pool]).set(volatility as f64);
        REGIME.with_label_values(&[pool]).set(regime_ordinal as f64);
    }

    pub fn price_rejected(pool: &str, reason: &str) {
        PRICE_REJECTED_TOTAL
            .with_label_values(&[pool, reason])
            .inc();
    }

    pub fn decision(pool: &str, outcome: &str, reason: &str, efficiency: u64) {
        DECISIONS_TOTAL
            .with_label_values(&[pool, outcome, reason])
            .inc();
        EFFICIENCY.with_label_values(&[pool]).set(efficiency as f64);
    }

    pub fn validation_failed(pool: &str, reason: &str) {
        VALIDATION_FAILURES_TOTAL
            .with_label_values(&[pool, reason])
            .inc();
    }

    pub fn rebalance_applied(pool: &str) {
        REBALANCES_APPLIED_TOTAL.with_label_values(&[pool]).inc();
    }

    /// Render every registered metric in Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
