//! Scenario configuration.
//!
//! A [`ScenarioConfig`] is fixed when a session is created. Server-wide
//! defaults come from [`ScenarioConfig::default`] or a TOML scenario file,
//! and each create request may override any subset of fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::briefing::RoleBriefings;
use crate::state::Side;

/// Errors raised while loading or merging scenario configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read scenario file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse scenario file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid overrides: {0}")]
    Overrides(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// When participants receive their side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePolicy {
    /// Alternate A, B, A, ... in join order.
    AssignAtJoin,
    /// Shuffle the active participants when the buy-sell phase opens, then alternate.
    AssignAtBuySell,
}

/// How each pair's negotiation mechanism is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismPolicy {
    /// Both members vote; disagreement is settled by a coin flip.
    PairVote,
    /// Every pair uses the mechanism derived from the winning remedy.
    SessionRemedy,
}

/// Which price a timed-auction lock records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPricePolicy {
    /// Store the price the locking client saw on its own clock.
    ClientReported,
    /// Recompute the price from the shared start time when the lock arrives.
    ServerClock,
}

/// Immutable per-session scenario parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub scenario_name: String,
    /// Display label for side A (the immediate-offer offeror).
    pub side_a_label: String,
    /// Display label for side B.
    pub side_b_label: String,
    /// Lower bound for private valuations handed out with roles.
    pub valuation_min: u64,
    /// Upper bound (inclusive) for private valuations.
    pub valuation_max: u64,
    /// Advisory limits shown to clients; the server never enforces them.
    pub offer_time_limit_seconds: u32,
    pub response_time_limit_seconds: u32,
    pub timed_auction_start_price: u64,
    pub timed_auction_drop_per_second: u64,
    pub role_policy: RolePolicy,
    pub mechanism_policy: MechanismPolicy,
    /// Shuffle each side before zipping into pairs.
    pub shuffle_pairs: bool,
    pub lock_price_policy: LockPricePolicy,
    pub briefings: RoleBriefings,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            scenario_name: "Notte Bellamonte Winery".to_string(),
            side_a_label: "Lucia".to_string(),
            side_b_label: "Marco".to_string(),
            valuation_min: 1_500_000,
            valuation_max: 3_500_000,
            offer_time_limit_seconds: 120,
            response_time_limit_seconds: 60,
            timed_auction_start_price: 5_000_000,
            timed_auction_drop_per_second: 25_000,
            role_policy: RolePolicy::AssignAtBuySell,
            mechanism_policy: MechanismPolicy::PairVote,
            shuffle_pairs: false,
            lock_price_policy: LockPricePolicy::ClientReported,
            briefings: RoleBriefings::default(),
        }
    }
}

impl ScenarioConfig {
    /// Load a scenario from a TOML file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge a partial JSON object over these values.
    ///
    /// Only top-level keys are replaced; `null` or an empty object keeps
    /// everything as is.
    pub fn with_overrides(&self, overrides: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut merged = serde_json::to_value(self)?;
        if let (Some(base), Some(patch)) = (merged.as_object_mut(), overrides.as_object()) {
            for (key, value) in patch {
                base.insert(key.clone(), value.clone());
            }
        }
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn side_label(&self, side: Side) -> &str {
        match side {
            Side::A => &self.side_a_label,
            Side::B => &self.side_b_label,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.valuation_min > self.valuation_max {
            return Err(ConfigError::Invalid(format!(
                "valuation_min {} exceeds valuation_max {}",
                self.valuation_min, self.valuation_max
            )));
        }
        if self.timed_auction_start_price == 0 {
            return Err(ConfigError::Invalid(
                "timed_auction_start_price must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ScenarioConfig::default();
        assert_eq!(config.side_a_label, "Lucia");
        assert_eq!(config.timed_auction_start_price, 5_000_000);
        assert_eq!(config.timed_auction_drop_per_second, 25_000);
        assert_eq!(config.role_policy, RolePolicy::AssignAtBuySell);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_overrides_keep_other_fields() {
        let base = ScenarioConfig::default();
        let merged = base
            .with_overrides(&serde_json::json!({
                "timed_auction_start_price": 3_000_000,
                "role_policy": "assign_at_join",
            }))
            .unwrap();

        assert_eq!(merged.timed_auction_start_price, 3_000_000);
        assert_eq!(merged.role_policy, RolePolicy::AssignAtJoin);
        assert_eq!(merged.valuation_max, base.valuation_max);
        assert_eq!(merged.briefings, base.briefings);
    }

    #[test]
    fn test_null_overrides_are_identity() {
        let base = ScenarioConfig::default();
        assert_eq!(base.with_overrides(&serde_json::Value::Null).unwrap(), base);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let base = ScenarioConfig::default();
        let err = base
            .with_overrides(&serde_json::json!({ "valuation_min": 9, "valuation_max": 1 }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = base
            .with_overrides(&serde_json::json!({ "role_policy": "whenever" }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Overrides(_)));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
scenario_name = "Harbour Ferry Partnership"
side_a_label = "Ada"
side_b_label = "Bram"
mechanism_policy = "session_remedy"
shuffle_pairs = true
"#
        )
        .unwrap();

        let config = ScenarioConfig::load(file.path()).unwrap();
        assert_eq!(config.scenario_name, "Harbour Ferry Partnership");
        assert_eq!(config.side_b_label, "Bram");
        assert_eq!(config.mechanism_policy, MechanismPolicy::SessionRemedy);
        assert!(config.shuffle_pairs);
        assert_eq!(config.valuation_min, 1_500_000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ScenarioConfig::load("/nonexistent/scenario.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
