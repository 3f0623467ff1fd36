// crates/almoner-engine/src/config.rs
//
// Runtime configuration for the Almoner engine.
// Loaded from a TOML file or populated with defaults.
//
// Amounts are written as decimal strings of whole tokens
// (`minimum_stake = "13.37"`) and parsed exactly.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use almoner_core::error::AlmonerError;
use almoner_economics::staking::StakingParams;
use almoner_economics::treasury::TreasuryParams;
use almoner_governance::params::GovernanceParams;

/// Engine configuration: one section per ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlmonerConfig {
    /// Default tracing filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub staking: StakingParams,

    #[serde(default)]
    pub governance: GovernanceParams,

    #[serde(default)]
    pub treasury: TreasuryParams,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for AlmonerConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            staking: StakingParams::default(),
            governance: GovernanceParams::default(),
            treasury: TreasuryParams::default(),
        }
    }
}

impl AlmonerConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AlmonerError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| AlmonerError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, AlmonerError> {
        let config: AlmonerConfig =
            toml::from_str(contents).map_err(|e| AlmonerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check caps and non-zero periods.
    pub fn validate(&self) -> Result<(), AlmonerError> {
        if self.staking.reward_duration_secs == 0 {
            return Err(AlmonerError::Config(
                "staking.reward_duration_secs must be non-zero".to_string(),
            ));
        }
        self.governance.validate()?;
        self.treasury.validate()
    }
}
