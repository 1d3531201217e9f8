//! Per-pool actor.
//!
//! Each pool owns one `RebalanceEngine` and its deployed `RangeSet`, and runs
//! as its own task draining an ordered command queue. Pools share nothing.

use seltra_core::{EngineError, Price, PriceObservation, RangeSet};
use seltra_engine::{
    DecisionOutcome, EngineStatus, RebalanceDecision, RebalanceEngine, RebalancingParams,
};
use seltra_telemetry::Metrics;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{OperatingMode, PoolConfig};
use crate::error::{AppError, AppResult};

/// Commands accepted by a pool task, applied in arrival order.
#[derive(Debug)]
pub enum PoolCommand {
    Tick {
        price: Price,
        at: u64,
    },
    Status {
        now: u64,
        reply: oneshot::Sender<AppResult<PoolSnapshot>>,
    },
}

/// A decision tagged with the pool that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct PoolDecision {
    pub pool_id: String,
    #[serde(flatten)]
    pub decision: RebalanceDecision,
    /// Whether the service executed the decision (apply mode only).
    pub applied: bool,
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub pool_id: String,
    pub status: EngineStatus,
    pub params: RebalancingParams,
    pub deployed: RangeSet,
    pub ticks_accepted: u64,
    pub ticks_rejected: u64,
}

/// Sending side of a pool task.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    pool_id: String,
    tx: mpsc::Sender<PoolCommand>,
}

impl PoolHandle {
    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    pub async fn send_tick(&self, price: Price, at: u64) -> AppResult<()> {
        self.tx
            .send(PoolCommand::Tick { price, at })
            .await
            .map_err(|_| AppError::ChannelClosed(self.pool_id.clone()))
    }

    pub async fn snapshot(&self, now: u64) -> AppResult<PoolSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PoolCommand::Status { now, reply })
            .await
            .map_err(|_| AppError::ChannelClosed(self.pool_id.clone()))?;
        rx.await
            .map_err(|_| AppError::ChannelClosed(self.pool_id.clone()))?
    }
}

/// Pool task state.
pub struct PoolActor {
    pool_id: String,
    engine: RebalanceEngine,
    deployed: RangeSet,
    total_liquidity: u128,
    mode: OperatingMode,
    decisions: mpsc::UnboundedSender<PoolDecision>,
    ticks_accepted: u64,
    ticks_rejected: u64,
}

impl PoolActor {
    pub fn new(
        config: &PoolConfig,
        mode: OperatingMode,
        now: u64,
        decisions: mpsc::UnboundedSender<PoolDecision>,
    ) -> AppResult<Self> {
        let engine = RebalanceEngine::initialize(
            config.engine.clone(),
            config.oracle.clone(),
            config.initial_price()?,
            now,
        )?;
        Ok(Self {
            pool_id: config.pool_id.clone(),
            engine,
            deployed: RangeSet::empty(),
            total_liquidity: config.total_liquidity as u128,
            mode,
            decisions,
            ticks_accepted: 0,
            ticks_rejected: 0,
        })
    }

    /// Spawn the actor, returning its handle and task.
    pub fn spawn(self, queue_capacity: usize) -> (PoolHandle, JoinHandle<PoolExit>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let handle = PoolHandle {
            pool_id: self.pool_id.clone(),
            tx,
        };
        let span = info_span!("pool", pool_id = %self.pool_id);
        let task = tokio::spawn(self.run(rx).instrument(span));
        (handle, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<PoolCommand>) -> PoolExit {
        info!(mode = ?self.mode, "Pool task started");
        while let Some(cmd) = rx.recv().await {
            match cmd {
                PoolCommand::Tick { price, at } => self.handle_tick(price, at),
                PoolCommand::Status { now, reply } => {
                    let _ = reply.send(self.snapshot(now));
                }
            }
        }
        info!(
            ticks_accepted = self.ticks_accepted,
            ticks_rejected = self.ticks_rejected,
            "Pool task stopped"
        );
        PoolExit {
            pool_id: self.pool_id,
            ticks_accepted: self.ticks_accepted,
            ticks_rejected: self.ticks_rejected,
            deployed: self.deployed,
        }
    }

    fn handle_tick(&mut self, price: Price, at: u64) {
        let obs = match PriceObservation::new(price, at) {
            Ok(obs) => obs,
            Err(e) => return self.reject(&e),
        };
        let volatility = match self.engine.on_price(obs) {
            Ok(v) => v,
            Err(e) => return self.reject(&e),
        };
        self.ticks_accepted += 1;
        let regime = self.engine.get_regime().map(|r| r.ordinal()).unwrap_or(0);
        Metrics::price_accepted(&self.pool_id, volatility, regime);

        let decision = match self
            .engine
            .evaluate(price, self.total_liquidity, &self.deployed, at)
        {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "Evaluation failed");
                return;
            }
        };

        Metrics::decision(
            &self.pool_id,
            decision.outcome.as_str(),
            &decision.reason,
            decision.efficiency_score,
        );
        if decision.outcome == DecisionOutcome::Rejected {
            Metrics::validation_failed(&self.pool_id, &decision.reason);
        }

        let applied = decision.trigger && self.mode == OperatingMode::Apply && self.apply(&decision, at);

        let out = PoolDecision {
            pool_id: self.pool_id.clone(),
            decision,
            applied,
        };
        if self.decisions.send(out).is_err() {
            debug!("Decision receiver dropped");
        }
    }

    /// Execute a triggered decision as the configured caller.
    fn apply(&mut self, decision: &RebalanceDecision, at: u64) -> bool {
        let Some(proposed) = decision.proposed_ranges.as_ref() else {
            return false;
        };
        let caller = self.engine.config().authorized_caller.clone();
        match self
            .engine
            .execute_rebalance(&caller, &self.deployed, proposed, decision.price, at)
        {
            Ok(assessment) => {
                info!(
                    decision_id = %decision.decision_id,
                    efficiency_gain = assessment.efficiency_gain,
                    ranges = %proposed,
                    "Rebalance applied"
                );
                self.deployed = proposed.clone();
                Metrics::rebalance_applied(&self.pool_id);
                true
            }
            Err(e) => {
                warn!(decision_id = %decision.decision_id, error = %e, "Rebalance execution failed");
                if let EngineError::Unsafe(reason) = &e {
                    Metrics::validation_failed(&self.pool_id, reason.code());
                }
                false
            }
        }
    }

    fn reject(&mut self, err: &EngineError) {
        self.ticks_rejected += 1;
        let reason = match err {
            EngineError::NotInitialized => "not_initialized",
            _ => "invalid_input",
        };
        warn!(error = %err, "Tick rejected");
        Metrics::price_rejected(&self.pool_id, reason);
    }

    fn snapshot(&self, now: u64) -> AppResult<PoolSnapshot> {
        Ok(PoolSnapshot {
            pool_id: self.pool_id.clone(),
            status: self.engine.get_engine_status(now)?,
            params: self.engine.rebalancing_params(),
            deployed: self.deployed.clone(),
            ticks_accepted: self.ticks_accepted,
            ticks_rejected: self.ticks_rejected,
        })
    }
}

/// Final counters returned when a pool task ends.
#[derive(Debug, Clone)]
pub struct PoolExit {
    pub pool_id: String,
    pub ticks_accepted: u64,
    pub ticks_rejected: u64,
    pub deployed: RangeSet,
}
