// crates/almoner-engine/src/events.rs
//
// Typed journal of committed state transitions.
//
// Entry points append events while they run; events of a call that fails
// are dropped together with its state changes. The host collects the
// journal with `Almoner::drain_events`.

use serde::{Deserialize, Serialize};

use almoner_core::identity::{Address, AssetId};
use almoner_core::{Amount, Timestamp};
use almoner_governance::{ResolutionOutcome, VoteDirection};

/// Outcome of a resolution as recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionKind {
    Slashed,
    PaidOut,
    NoAction,
}

impl From<&ResolutionOutcome> for ResolutionKind {
    fn from(outcome: &ResolutionOutcome) -> Self {
        match outcome {
            ResolutionOutcome::Slash { .. } => ResolutionKind::Slashed,
            ResolutionOutcome::Payout { .. } => ResolutionKind::PaidOut,
            ResolutionOutcome::NoAction => ResolutionKind::NoAction,
        }
    }
}

/// An administrative parameter change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parameter {
    SwapRouter(Address),
    EcoFund(Address),
    FundPercentage(u32),
    BurnPercentage(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AlmonerEvent {
    Staked {
        participant: Address,
        amount: Amount,
        lock_expiry: Timestamp,
    },
    Withdrawn {
        participant: Address,
        amount: Amount,
    },
    RewardPaid {
        participant: Address,
        reward: Amount,
    },
    RewardAdded {
        amount: Amount,
        period_finish: Timestamp,
    },
    ProposalCreated {
        id: u64,
        proposer: Address,
        withdraw_amount: Amount,
        withdraw_address: Address,
    },
    VoteCast {
        id: u64,
        voter: Address,
        direction: VoteDirection,
        weight: u128,
        credited: u128,
    },
    ProposalResolved {
        id: u64,
        quorum_bps: u128,
        quorum_met: bool,
        outcome: ResolutionKind,
    },
    StakeSlashed {
        proposal_id: u64,
        offender: Address,
        amount: Amount,
    },
    Deposited {
        from: Address,
        asset: AssetId,
        amount: Amount,
        eco_cut: Amount,
    },
    TreasuryPayout {
        recipient: Address,
        amount: Amount,
    },
    EcoFundWithdrawn {
        asset: AssetId,
        amount: Amount,
        recipient: Address,
    },
    Converted {
        source: AssetId,
        destination: AssetId,
        amount_in: Amount,
        amount_out: Amount,
    },
    GovernanceBound {
        gov: Address,
    },
    ParameterChanged {
        parameter: Parameter,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = AlmonerEvent::GovernanceBound {
            gov: Address::labelled("gov"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "governance_bound");
        assert!(json["gov"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_resolution_kind_from_outcome() {
        assert_eq!(
            ResolutionKind::from(&ResolutionOutcome::NoAction),
            ResolutionKind::NoAction
        );
        let payout = ResolutionOutcome::Payout {
            recipient: Address::labelled("alice"),
            amount: 1,
        };
        assert_eq!(ResolutionKind::from(&payout), ResolutionKind::PaidOut);
    }
}
