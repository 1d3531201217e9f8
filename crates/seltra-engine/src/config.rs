//! Rebalancing engine configuration.

use serde::{Deserialize, Serialize};

/// Upper bound for `max_slippage_bps` (10%).
pub const MAX_SLIPPAGE_BPS: u64 = 1_000;

/// Rebalancing engine configuration.
///
/// Immutable once the engine is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Identity allowed to execute rebalances.
    #[serde(default = "default_authorized_caller")]
    pub authorized_caller: String,

    /// Maximum tolerated slippage in basis points, in (0, 1000].
    /// Default: 100 (1%).
    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: u64,

    /// Minimum time between completed rebalances. Default: 300 seconds.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Minimum width of a deployed range relative to its lower bound.
    /// Default: 50 bps (0.5%).
    #[serde(default = "default_min_range_size_bps")]
    pub min_range_size_bps: u64,
}

fn default_authorized_caller() -> String {
    "operator".to_string()
}

fn default_max_slippage_bps() -> u64 {
    100
}

fn default_cooldown_seconds() -> u64 {
    300
}

fn default_min_range_size_bps() -> u64 {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            authorized_caller: default_authorized_caller(),
            max_slippage_bps: default_max_slippage_bps(),
            cooldown_seconds: default_cooldown_seconds(),
            min_range_size_bps: default_min_range_size_bps(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.authorized_caller.trim().is_empty() {
            return Err("authorized_caller must not be empty".to_string());
        }
        if self.max_slippage_bps == 0 || self.max_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(format!(
                "max_slippage_bps must be in (0, {MAX_SLIPPAGE_BPS}], got {}",
                self.max_slippage_bps
            ));
        }
        if self.cooldown_seconds == 0 {
            return Err("cooldown_seconds must be positive".to_string());
        }
        if self.min_range_size_bps == 0 {
            return Err("min_range_size_bps must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_slippage_bps, 100);
        assert_eq!(config.cooldown_seconds, 300);
        assert_eq!(config.min_range_size_bps, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let bad = [
            EngineConfig {
                max_slippage_bps: 0,
                ..Default::default()
            },
            EngineConfig {
                max_slippage_bps: 1_001,
                ..Default::default()
            },
            EngineConfig {
                cooldown_seconds: 0,
                ..Default::default()
            },
            EngineConfig {
                min_range_size_bps: 0,
                ..Default::default()
            },
            EngineConfig {
                authorized_caller: "  ".to_string(),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }

        let edge = EngineConfig {
            max_slippage_bps: MAX_SLIPPAGE_BPS,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
authorized_caller = "pool-7"
cooldown_seconds = 600
"#,
        )
        .unwrap();
        assert_eq!(config.authorized_caller, "pool-7");
        assert_eq!(config.cooldown_seconds, 600);
        assert_eq!(config.min_range_size_bps, 50);
    }
}
