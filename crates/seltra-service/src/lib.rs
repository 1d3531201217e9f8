//! Multi-pool rebalancing service.
//!
//! Hosts one rebalancing engine per configured pool:
//! - TOML configuration (`AppConfig`)
//! - JSON-lines tick ingestion, routed by pool id
//! - One task per pool draining an ordered queue
//! - Decisions written back out as JSON lines
//! - Periodic status summaries and Prometheus counters

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod pool;
pub mod tick;

pub use app::{Application, RunSummary};
pub use clock::{Clock, MonotonicClock};
pub use config::{AppConfig, OperatingMode, PoolConfig, TelemetryConfig};
pub use error::{AppError, AppResult};
pub use pool::{PoolActor, PoolDecision, PoolHandle, PoolSnapshot};
pub use tick::TickMessage;
