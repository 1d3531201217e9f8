//! Application configuration.

use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;
use seltra_core::Price;
use seltra_engine::EngineConfig;
use seltra_oracle::OracleConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Emit decisions only; deployed ranges never change.
    #[default]
    Observation,
    /// Execute triggered decisions as the pool's authorized caller.
    Apply,
}

/// Logging and metrics output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default tracing filter (overridden by `RUST_LOG`).
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Write Prometheus text output here on shutdown.
    #[serde(default)]
    pub metrics_path: Option<String>,
}

/// One managed pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub pool_id: String,
    /// Price used to seed the volatility oracle, as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub initial_price: Decimal,
    /// Liquidity the pool spreads over its ranges (integer units).
    pub total_liquidity: u64,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl PoolConfig {
    pub fn initial_price(&self) -> AppResult<Price> {
        let price = Price::from_decimal(self.initial_price)?;
        if price.is_zero() {
            return Err(AppError::Config(format!(
                "pool {}: initial_price must be positive",
                self.pool_id
            )));
        }
        Ok(price)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: OperatingMode,

    /// Per-pool command queue capacity. Default: 1000.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Interval between status summaries (seconds). Default: 60.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

fn default_queue_capacity() -> usize {
    1_000
}

fn default_status_interval_secs() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.queue_capacity == 0 {
            return Err(AppError::Config("queue_capacity must be positive".to_string()));
        }
        if self.status_interval_secs == 0 {
            return Err(AppError::Config(
                "status_interval_secs must be positive".to_string(),
            ));
        }
        if self.pools.is_empty() {
            return Err(AppError::Config("at least one pool is required".to_string()));
        }

        let mut seen = HashSet::new();
        for pool in &self.pools {
            if pool.pool_id.trim().is_empty() {
                return Err(AppError::Config("pool_id must not be empty".to_string()));
            }
            if !seen.insert(pool.pool_id.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate pool_id: {}",
                    pool.pool_id
                )));
            }
            pool.initial_price()
                .map_err(|e| AppError::Config(format!("pool {}: {e}", pool.pool_id)))?;
            if pool.total_liquidity == 0 {
                return Err(AppError::Config(format!(
                    "pool {}: total_liquidity must be positive",
                    pool.pool_id
                )));
            }
            pool.engine
                .validate()
                .map_err(|e| AppError::Config(format!("pool {}: {e}", pool.pool_id)))?;
            pool.oracle
                .validate()
                .map_err(|e| AppError::Config(format!("pool {}: {e}", pool.pool_id)))?;
        }
        Ok(())
    }

    pub fn is_observation_mode(&self) -> bool {
        self.mode == OperatingMode::Observation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
mode = "apply"
status_interval_secs = 30

[telemetry]
log_filter = "info"

[[pools]]
pool_id = "algo-usdc"
initial_price = "0.2345"
total_liquidity = 1000000

[pools.engine]
authorized_caller = "keeper"
cooldown_seconds = 120

[[pools]]
pool_id = "eth-usdc"
initial_price = "2500"
total_liquidity = 5000000

[pools.oracle]
alpha = 100000
"#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.mode, OperatingMode::Apply);
        assert_eq!(config.queue_capacity, 1_000);
        assert_eq!(config.status_interval_secs, 30);
        assert_eq!(config.pools.len(), 2);

        let algo = &config.pools[0];
        assert_eq!(algo.initial_price, dec!(0.2345));
        assert_eq!(algo.initial_price().unwrap().raw(), 234_500_000_000_000_000);
        assert_eq!(algo.engine.authorized_caller, "keeper");
        assert_eq!(algo.engine.cooldown_seconds, 120);
        assert_eq!(algo.oracle, OracleConfig::default());

        let eth = &config.pools[1];
        assert_eq!(eth.engine, EngineConfig::default());
        assert_eq!(eth.oracle.alpha, 100_000);
    }

    #[test]
    fn test_default_mode_is_observation() {
        let config = AppConfig::from_toml(
            r#"
[[pools]]
pool_id = "p"
initial_price = "1"
total_liquidity = 10
"#,
        )
        .unwrap();
        assert!(config.is_observation_mode());
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("no pools", "mode = \"apply\"\n"),
            (
                "duplicate",
                r#"
[[pools]]
pool_id = "p"
initial_price = "1"
total_liquidity = 10
[[pools]]
pool_id = "p"
initial_price = "2"
total_liquidity = 10
"#,
            ),
            (
                "zero price",
                r#"
[[pools]]
pool_id = "p"
initial_price = "0"
total_liquidity = 10
"#,
            ),
            (
                "zero liquidity",
                r#"
[[pools]]
pool_id = "p"
initial_price = "1"
total_liquidity = 0
"#,
            ),
            (
                "bad engine",
                r#"
[[pools]]
pool_id = "p"
initial_price = "1"
total_liquidity = 10
[pools.engine]
max_slippage_bps = 5000
"#,
            ),
            (
                "bad oracle",
                r#"
[[pools]]
pool_id = "p"
initial_price = "1"
total_liquidity = 10
[pools.oracle]
window_size = 0
"#,
            ),
        ];
        for (name, toml) in cases {
            assert!(
                matches!(AppConfig::from_toml(toml), Err(AppError::Config(_))),
                "{name} should be rejected"
            );
        }
    }
}
