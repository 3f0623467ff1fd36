// crates/almoner-governance/src/params.rs
//
// Governance parameters. All values are configuration with defaults; none
// of them is hard-coded in the state machine.

use serde::{Deserialize, Serialize};

use almoner_core::error::AlmonerError;
use almoner_core::Amount;
use almoner_economics::token::{decimal_string, WAD};

/// Voting window of a proposal: 2 days.
pub const DEFAULT_PROPOSAL_PERIOD_SECS: u64 = 2 * 24 * 60 * 60;

/// Stake required to open a proposal: 13.37 tokens.
pub const DEFAULT_MINIMUM_STAKE: Amount = 1337 * WAD / 100;

/// Proposals asking for more than this are slashed if quorum fails:
/// 1000 tokens.
pub const DEFAULT_WITHDRAW_THRESHOLD: Amount = 1000 * WAD;

/// Participation needed for the payout branch, in basis points of
/// `isqrt(total_staked)`.
pub const DEFAULT_QUORUM_BPS: u32 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Seconds a proposal stays open for voting.
    #[serde(default = "default_proposal_period")]
    pub proposal_period_secs: u64,

    /// Minimum stake to propose.
    #[serde(default = "default_minimum_stake", with = "decimal_string")]
    pub minimum_stake: Amount,

    /// Withdraw amount above which an under-quorum proposal is slashed.
    #[serde(default = "default_withdraw_threshold", with = "decimal_string")]
    pub withdraw_threshold: Amount,

    /// Quorum threshold, see `ProposalRegistry::quorum_bps`.
    #[serde(default = "default_quorum_bps")]
    pub quorum_bps: u32,
}

fn default_proposal_period() -> u64 {
    DEFAULT_PROPOSAL_PERIOD_SECS
}

fn default_minimum_stake() -> Amount {
    DEFAULT_MINIMUM_STAKE
}

fn default_withdraw_threshold() -> Amount {
    DEFAULT_WITHDRAW_THRESHOLD
}

fn default_quorum_bps() -> u32 {
    DEFAULT_QUORUM_BPS
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            proposal_period_secs: default_proposal_period(),
            minimum_stake: default_minimum_stake(),
            withdraw_threshold: default_withdraw_threshold(),
            quorum_bps: default_quorum_bps(),
        }
    }
}

impl GovernanceParams {
    pub fn validate(&self) -> Result<(), AlmonerError> {
        if self.proposal_period_secs == 0 {
            return Err(AlmonerError::Config(
                "governance.proposal_period_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = GovernanceParams::default();
        assert_eq!(params.proposal_period_secs, 172_800);
        assert_eq!(params.minimum_stake, 13_370_000_000_000_000_000);
        assert_eq!(params.withdraw_threshold, 1_000 * WAD);
        assert_eq!(params.quorum_bps, 3_000);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let params: GovernanceParams = toml::from_str(
            r#"
            minimum_stake = "50"
            quorum_bps = 2500
            "#,
        )
        .unwrap();
        assert_eq!(params.minimum_stake, 50 * WAD);
        assert_eq!(params.quorum_bps, 2_500);
        assert_eq!(params.withdraw_threshold, DEFAULT_WITHDRAW_THRESHOLD);
        assert_eq!(params.proposal_period_secs, DEFAULT_PROPOSAL_PERIOD_SECS);
    }

    #[test]
    fn test_zero_period_rejected() {
        let params = GovernanceParams {
            proposal_period_secs: 0,
            ..GovernanceParams::default()
        };
        assert!(matches!(params.validate(), Err(AlmonerError::Config(_))));
    }
}
