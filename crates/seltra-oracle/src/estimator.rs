//! EWMA volatility estimation over fixed-point price ticks.
//!
//! Each accepted tick produces a return `r = (new - old) * 1e6 / old`
//! (signed, 1e6 scale) which feeds an exponentially weighted mean and
//! variance. Volatility is the integer square root of that variance.
//!
//! All arithmetic is checked; an overflow rejects the tick with
//! `InvalidInput` and leaves the state untouched.

use std::collections::VecDeque;

use seltra_core::{
    classify, isqrt, EngineError, EngineResult, Price, PriceObservation, Regime, VOLATILITY_SCALE,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::OracleConfig;

/// Snapshot of the estimator's EWMA state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolatilityState {
    /// EWMA of returns (1e6 scale, signed).
    pub ewma_mean: i128,
    /// EWMA of squared deviations (1e12 scale).
    pub ewma_variance: u128,
    /// `isqrt(ewma_variance)`, 1e6 scale.
    pub current_volatility: u64,
    pub regime: Regime,
    /// Timestamp of the most recent accepted observation.
    pub last_update_time: u64,
    pub last_price: Price,
    /// Ticks accepted since initialization.
    pub update_count: u64,
}

#[derive(Debug)]
struct Initialized {
    alpha: u64,
    window_size: usize,
    state: VolatilityState,
    history: VecDeque<PriceObservation>,
}

/// Per-pool EWMA volatility estimator.
#[derive(Debug, Default)]
pub struct VolatilityEstimator {
    inner: Option<Initialized>,
}

impl VolatilityEstimator {
    /// Create an uninitialized estimator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and initialize from a config in one step.
    pub fn with_config(config: &OracleConfig, initial: PriceObservation) -> EngineResult<Self> {
        let mut estimator = Self::new();
        estimator.initialize(initial, config.alpha, config.window_size)?;
        Ok(estimator)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.is_some()
    }

    /// Seed the estimator with its first price.
    ///
    /// Mean, variance and volatility start at zero.
    pub fn initialize(
        &mut self,
        initial: PriceObservation,
        alpha: u64,
        window_size: usize,
    ) -> EngineResult<()> {
        if self.inner.is_some() {
            return Err(EngineError::InvalidConfig(
                "volatility estimator already initialized".to_string(),
            ));
        }
        OracleConfig { alpha, window_size }
            .validate()
            .map_err(EngineError::InvalidConfig)?;
        if initial.price.is_zero() {
            return Err(EngineError::InvalidInput(
                "initial price must be positive".to_string(),
            ));
        }

        let mut history = VecDeque::with_capacity(window_size);
        history.push_back(initial);

        self.inner = Some(Initialized {
            alpha,
            window_size,
            state: VolatilityState {
                ewma_mean: 0,
                ewma_variance: 0,
                current_volatility: 0,
                regime: classify(0).regime,
                last_update_time: initial.observed_at,
                last_price: initial.price,
                update_count: 0,
            },
            history,
        });

        info!(
            initial_price = %initial.price,
            alpha,
            window_size,
            "Volatility estimator initialized"
        );
        Ok(())
    }

    /// Fold a new tick into the EWMA and return the updated volatility.
    pub fn update(&mut self, obs: PriceObservation) -> EngineResult<u64> {
        let inner = self.inner.as_mut().ok_or(EngineError::NotInitialized)?;

        if obs.price.is_zero() {
            return Err(EngineError::InvalidInput(
                "price must be positive".to_string(),
            ));
        }
        if obs.observed_at < inner.state.last_update_time {
            return Err(EngineError::InvalidInput(format!(
                "timestamp regressed: {} < {}",
                obs.observed_at, inner.state.last_update_time
            )));
        }

        let next = next_state(&inner.state, inner.alpha, obs)?;
        let previous_regime = inner.state.regime;
        inner.state = next;

        inner.history.push_back(obs);
        while inner.history.len() > inner.window_size {
            inner.history.pop_front();
        }

        debug!(
            price = %obs.price,
            observed_at = obs.observed_at,
            ewma_mean = %next.ewma_mean,
            ewma_variance = %next.ewma_variance,
            volatility = next.current_volatility,
            "Volatility updated"
        );
        if next.regime != previous_regime {
            info!(
                from = %previous_regime,
                to = %next.regime,
                volatility = next.current_volatility,
                "Volatility regime changed"
            );
        }

        Ok(next.current_volatility)
    }

    pub fn state(&self) -> EngineResult<&VolatilityState> {
        self.inner
            .as_ref()
            .map(|i| &i.state)
            .ok_or(EngineError::NotInitialized)
    }

    /// Current volatility (1e6 scale).
    pub fn volatility(&self) -> EngineResult<u64> {
        Ok(self.state()?.current_volatility)
    }

    pub fn regime(&self) -> EngineResult<Regime> {
        Ok(self.state()?.regime)
    }

    /// Recent observations, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &PriceObservation> {
        self.inner.iter().flat_map(|i| i.history.iter())
    }
}

fn overflow(what: &str) -> EngineError {
    EngineError::InvalidInput(format!("arithmetic overflow computing {what}"))
}

/// Pure EWMA step; the caller commits the result only on success.
fn next_state(
    state: &VolatilityState,
    alpha: u64,
    obs: PriceObservation,
) -> EngineResult<VolatilityState> {
    let scale = VOLATILITY_SCALE as i128;
    let alpha_i = alpha as i128;
    let keep_i = scale - alpha_i;

    let old = state.last_price.raw();
    let new = obs.price.raw();

    // Return magnitude truncates toward zero, sign applied afterwards.
    let magnitude = new
        .abs_diff(old)
        .checked_mul(VOLATILITY_SCALE as u128)
        .ok_or_else(|| overflow("return"))?
        / old;
    let magnitude = i128::try_from(magnitude).map_err(|_| overflow("return"))?;
    let ret = if new >= old { magnitude } else { -magnitude };

    let mean = alpha_i
        .checked_mul(ret)
        .zip(keep_i.checked_mul(state.ewma_mean))
        .and_then(|(a, b)| a.checked_add(b))
        .ok_or_else(|| overflow("ewma mean"))?
        / scale;

    let deviation_sq = ret
        .checked_sub(mean)
        .map(i128::unsigned_abs)
        .and_then(|d| d.checked_mul(d))
        .ok_or_else(|| overflow("deviation"))?;

    let variance = (alpha as u128)
        .checked_mul(deviation_sq)
        .zip((keep_i as u128).checked_mul(state.ewma_variance))
        .and_then(|(a, b)| a.checked_add(b))
        .ok_or_else(|| overflow("ewma variance"))?
        / VOLATILITY_SCALE as u128;

    // isqrt of a u128 always fits in u64.
    let volatility = isqrt(variance) as u64;

    Ok(VolatilityState {
        ewma_mean: mean,
        ewma_variance: variance,
        current_volatility: volatility,
        regime: classify(volatility).regime,
        last_update_time: obs.observed_at,
        last_price: obs.price,
        update_count: state.update_count + 1,
    })
}
