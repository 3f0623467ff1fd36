// crates/almoner-economics/src/slashing.rs
//
// Slashing conditions and penalty computation.
//
// One condition triggers slashing: a proposer whose high-value proposal
// (withdraw amount above the configured threshold) fails to reach quorum
// forfeits their entire stake. Forfeited stake flows to the treasury as a
// reward-asset inflow.

use serde::{Deserialize, Serialize};

use almoner_core::identity::Address;
use almoner_core::math::{bps_share, BPS_DENOMINATOR};
use almoner_core::Amount;

/// Share of stake forfeited for a failed high-value proposal: 100%.
pub const UNDER_QUORUM_PENALTY_BPS: u32 = BPS_DENOMINATOR;

/// Conditions that trigger slashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashCondition {
    /// A proposal requesting more than the withdraw threshold closed
    /// without reaching quorum.
    UnderQuorumProposal {
        proposal_id: u64,
        withdraw_amount: Amount,
    },
}

/// Result of a slashing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashResult {
    /// The condition that triggered the slash.
    pub condition: SlashCondition,
    /// The participant whose stake was forfeited.
    pub offender: Address,
    /// The amount of stake forfeited.
    pub amount_slashed: Amount,
}

/// Compute the penalty for a given slashing condition.
///
/// Never exceeds `current_stake`.
pub fn compute_penalty(condition: &SlashCondition, current_stake: Amount) -> Amount {
    let rate = match condition {
        SlashCondition::UnderQuorumProposal { .. } => UNDER_QUORUM_PENALTY_BPS,
    };
    bps_share(current_stake, rate).min(current_stake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokens;

    fn condition() -> SlashCondition {
        SlashCondition::UnderQuorumProposal {
            proposal_id: 3,
            withdraw_amount: tokens(1001),
        }
    }

    #[test]
    fn test_under_quorum_slashes_all() {
        let stake = tokens(100);
        assert_eq!(compute_penalty(&condition(), stake), stake);
    }

    #[test]
    fn test_odd_stake_slashed_exactly() {
        let stake = tokens(100) + 7;
        assert_eq!(compute_penalty(&condition(), stake), stake);
    }

    #[test]
    fn test_zero_stake() {
        assert_eq!(compute_penalty(&condition(), 0), 0);
    }
}
