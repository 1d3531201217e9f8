//! Application orchestration.
//!
//! Reads ticks as JSON lines, routes each to its pool task, and writes every
//! decision back out as a JSON line. Status summaries are logged on a timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use seltra_telemetry::Metrics;

use crate::clock::{resolve_timestamp, Clock};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::pool::{PoolActor, PoolDecision, PoolExit, PoolHandle};
use crate::tick::TickMessage;

/// Counters for one run of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub ticks_routed: u64,
    pub ticks_dropped: u64,
    pub decisions_written: u64,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    clock: Arc<dyn Clock>,
}

impl Application {
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config, clock })
    }

    fn spawn_pools(
        &self,
        decisions: mpsc::UnboundedSender<PoolDecision>,
    ) -> AppResult<(HashMap<String, PoolHandle>, Vec<JoinHandle<PoolExit>>)> {
        let now = self.clock.now_secs();
        let mut handles = HashMap::with_capacity(self.config.pools.len());
        let mut tasks = Vec::with_capacity(self.config.pools.len());

        for pool in &self.config.pools {
            let actor = PoolActor::new(pool, self.config.mode, now, decisions.clone())?;
            let (handle, task) = actor.spawn(self.config.queue_capacity);
            info!(
                pool_id = %pool.pool_id,
                initial_price = %pool.initial_price,
                total_liquidity = pool.total_liquidity,
                "Pool registered"
            );
            handles.insert(pool.pool_id.clone(), handle);
            tasks.push(task);
        }
        Ok((handles, tasks))
    }

    /// Run until the input is exhausted or ctrl-c is received.
    pub async fn run<R, W>(self, input: R, mut output: W) -> AppResult<RunSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(mode = ?self.config.mode, pools = self.config.pools.len(), "Starting application");

        let (decision_tx, mut decision_rx) = mpsc::unbounded_channel::<PoolDecision>();
        let (handles, tasks) = self.spawn_pools(decision_tx)?;

        let mut summary = RunSummary::default();
        let mut lines = input.lines();
        let mut status_interval =
            tokio::time::interval(Duration::from_secs(self.config.status_interval_secs));
        status_interval.tick().await;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            summary.lines_read += 1;
                            match self.route(&handles, &line).await {
                                Ok(true) => summary.ticks_routed += 1,
                                Ok(false) => {}
                                Err(e) => {
                                    summary.ticks_dropped += 1;
                                    warn!(error = %e, "Tick dropped");
                                }
                            }
                        }
                        None => {
                            info!("Input exhausted");
                            break;
                        }
                    }
                }

                Some(decision) = decision_rx.recv() => {
                    write_decision(&mut output, &decision).await?;
                    summary.decisions_written += 1;
                }

                _ = status_interval.tick() => {
                    self.log_status(&handles).await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Final status, then close every queue and wait for the pools to drain.
        self.log_status(&handles).await;
        drop(handles);
        for task in tasks {
            let exit = task.await?;
            info!(
                pool_id = %exit.pool_id,
                ticks_accepted = exit.ticks_accepted,
                ticks_rejected = exit.ticks_rejected,
                deployed = %exit.deployed,
                "Pool drained"
            );
        }
        while let Some(decision) = decision_rx.recv().await {
            write_decision(&mut output, &decision).await?;
            summary.decisions_written += 1;
        }
        output.flush().await?;

        info!(
            lines_read = summary.lines_read,
            ticks_routed = summary.ticks_routed,
            ticks_dropped = summary.ticks_dropped,
            decisions_written = summary.decisions_written,
            "Shutting down"
        );
        Ok(summary)
    }

    /// Parse and forward one line. `Ok(false)` for blank or comment lines.
    async fn route(&self, handles: &HashMap<String, PoolHandle>, line: &str) -> AppResult<bool> {
        let Some(msg) = TickMessage::parse_line(line)? else {
            return Ok(false);
        };
        let Some(handle) = handles.get(&msg.pool) else {
            Metrics::price_rejected(&msg.pool, "unknown_pool");
            return Err(AppError::UnknownPool(msg.pool));
        };
        let price = match msg.fixed_price() {
            Ok(p) => p,
            Err(e) => {
                Metrics::price_rejected(&msg.pool, "parse");
                return Err(e);
            }
        };
        let at = resolve_timestamp(self.clock.as_ref(), msg.ts);
        debug!(pool_id = %msg.pool, price = %price, at, "Routing tick");
        handle.send_tick(price, at).await?;
        Ok(true)
    }

    async fn log_status(&self, handles: &HashMap<String, PoolHandle>) {
        let now = self.clock.now_secs();
        for handle in handles.values() {
            match handle.snapshot(now).await {
                Ok(snap) => info!(
                    pool_id = %snap.pool_id,
                    status = %snap.status,
                    ticks_accepted = snap.ticks_accepted,
                    ticks_rejected = snap.ticks_rejected,
                    deployed = %snap.deployed,
                    "Pool status"
                ),
                Err(e) => warn!(pool_id = %handle.pool_id(), error = %e, "Status unavailable"),
            }
        }
    }
}

async fn write_decision<W: AsyncWrite + Unpin>(
    output: &mut W,
    decision: &PoolDecision,
) -> AppResult<()> {
    let mut line = serde_json::to_vec(decision)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    Ok(())
}
