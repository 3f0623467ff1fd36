// crates/almoner-governance/src/proposal.rs
//
// Funding proposals and their lifecycle.
//
//   Open        start <= now < start + proposal_period   (accepts votes)
//   Resolvable  now >= start + proposal_period, unresolved
//   Resolved    terminal, set exactly once by resolution

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use almoner_core::identity::Address;
use almoner_core::{Amount, Timestamp};

/// Side of a vote. Fixed by the first vote, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    For,
    Against,
}

/// A participant's standing vote on one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub direction: VoteDirection,
    /// Weight already added to the tally on `direction`'s side.
    pub credited_weight: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Open,
    Resolvable,
    Resolved,
}

/// A request to pay `withdraw_amount` of the settlement asset to
/// `withdraw_address`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub url: String,
    pub title: String,
    pub withdraw_amount: Amount,
    pub withdraw_address: Address,
    pub start: Timestamp,
    pub total_for_votes: u128,
    pub total_against_votes: u128,
    pub resolved: bool,
    pub ballots: HashMap<Address, Ballot>,
}

impl Proposal {
    pub fn new(
        id: u64,
        proposer: Address,
        url: String,
        title: String,
        withdraw_amount: Amount,
        withdraw_address: Address,
        start: Timestamp,
    ) -> Self {
        Self {
            id,
            proposer,
            url,
            title,
            withdraw_amount,
            withdraw_address,
            start,
            total_for_votes: 0,
            total_against_votes: 0,
            resolved: false,
            ballots: HashMap::new(),
        }
    }

    /// First instant at which the proposal may be resolved.
    pub fn ends_at(&self, proposal_period: u64) -> Timestamp {
        self.start.saturating_add(proposal_period)
    }

    pub fn status(&self, now: Timestamp, proposal_period: u64) -> ProposalStatus {
        if self.resolved {
            ProposalStatus::Resolved
        } else if now < self.ends_at(proposal_period) {
            ProposalStatus::Open
        } else {
            ProposalStatus::Resolvable
        }
    }

    pub fn ballot(&self, voter: &Address) -> Option<&Ballot> {
        self.ballots.get(voter)
    }

    /// Combined weight of both sides.
    pub fn total_votes(&self) -> u128 {
        self.total_for_votes.saturating_add(self.total_against_votes)
    }

    pub fn tally(&self, direction: VoteDirection) -> u128 {
        match direction {
            VoteDirection::For => self.total_for_votes,
            VoteDirection::Against => self.total_against_votes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(start: Timestamp) -> Proposal {
        Proposal::new(
            0,
            Address::labelled("alice"),
            "https://forum.example/t/1".to_string(),
            "Fund the docs".to_string(),
            10,
            Address::labelled("alice"),
            start,
        )
    }

    #[test]
    fn test_status_transitions() {
        let mut p = sample(100);
        assert_eq!(p.status(100, 50), ProposalStatus::Open);
        assert_eq!(p.status(149, 50), ProposalStatus::Open);
        assert_eq!(p.status(150, 50), ProposalStatus::Resolvable);
        p.resolved = true;
        assert_eq!(p.status(150, 50), ProposalStatus::Resolved);
        assert_eq!(p.status(120, 50), ProposalStatus::Resolved);
    }

    #[test]
    fn test_new_proposal_is_empty() {
        let p = sample(0);
        assert_eq!(p.total_votes(), 0);
        assert!(p.ballot(&Address::labelled("bob")).is_none());
        assert!(!p.resolved);
    }
}
