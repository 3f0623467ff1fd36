// crates/almoner-governance/src/registry.rs
//
// Append-only proposal registry and the resolution state machine.
//
// The registry decides; it never moves assets. `resolve` returns a
// `Resolution` describing the single consequence (slash, payout, or
// nothing) and the caller applies it against the stake ledger and the
// treasury after the `resolved` flag is committed.
//
// Quorum is evaluated at resolution time, in square-root space:
//
//   quorum_bps = (total_for + total_against) * 10000 / isqrt(total_staked)
//   met       <=> total_staked > 0 && quorum_bps >= params.quorum_bps

use serde::{Deserialize, Serialize};

use almoner_core::error::AlmonerError;
use almoner_core::identity::Address;
use almoner_core::math::{isqrt, mul_div, BPS_DENOMINATOR};
use almoner_core::{Amount, Timestamp};
use almoner_economics::token::Units;

use crate::params::GovernanceParams;
use crate::proposal::{Ballot, Proposal, ProposalStatus, VoteDirection};
use crate::voting::{QuadraticVotingEngine, VoteOutcome};

/// The consequence of resolving a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Quorum failed on a high-value request: forfeit the proposer's stake.
    Slash {
        proposer: Address,
        withdraw_amount: Amount,
    },
    /// Quorum met and the proposal passed: pay the request.
    Payout { recipient: Address, amount: Amount },
    /// Nothing moves.
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: u64,
    pub quorum_bps: u128,
    pub quorum_met: bool,
    pub outcome: ResolutionOutcome,
}

/// Input for a new proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalRequest {
    pub url: String,
    pub title: String,
    pub withdraw_amount: Amount,
    pub withdraw_address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRegistry {
    params: GovernanceParams,
    proposals: Vec<Proposal>,
    #[serde(skip)]
    voting: QuadraticVotingEngine,
}

impl ProposalRegistry {
    pub fn new(params: GovernanceParams) -> Self {
        Self {
            params,
            proposals: Vec::new(),
            voting: QuadraticVotingEngine::new(),
        }
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposal(&self, id: u64) -> Result<&Proposal, AlmonerError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.proposals.get(i))
            .ok_or(AlmonerError::ProposalNotFound { id })
    }

    fn proposal_mut(&mut self, id: u64) -> Result<&mut Proposal, AlmonerError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.proposals.get_mut(i))
            .ok_or(AlmonerError::ProposalNotFound { id })
    }

    pub fn status(&self, id: u64, now: Timestamp) -> Result<ProposalStatus, AlmonerError> {
        Ok(self.proposal(id)?.status(now, self.params.proposal_period_secs))
    }

    pub fn ballot(&self, id: u64, voter: &Address) -> Result<Option<Ballot>, AlmonerError> {
        Ok(self.proposal(id)?.ballot(voter).copied())
    }

    /// Open a proposal. `proposer_stake` is the proposer's current stake.
    ///
    /// # Errors
    /// Returns `AlmonerError::InsufficientStake` below the minimum stake.
    pub fn propose(
        &mut self,
        proposer: &Address,
        proposer_stake: Amount,
        request: ProposalRequest,
        now: Timestamp,
    ) -> Result<u64, AlmonerError> {
        if proposer_stake < self.params.minimum_stake {
            return Err(AlmonerError::InsufficientStake {
                have: proposer_stake,
                need: self.params.minimum_stake,
            });
        }
        let id = self.proposal_count();
        let proposal = Proposal::new(
            id,
            *proposer,
            request.url,
            request.title,
            request.withdraw_amount,
            request.withdraw_address,
            now,
        );
        tracing::info!(
            proposal_id = id,
            proposer = %proposer,
            withdraw_amount = %Units(proposal.withdraw_amount),
            title = %proposal.title,
            "Proposal created"
        );
        self.proposals.push(proposal);
        Ok(id)
    }

    /// Credit a vote. `voter_stake` is the voter's current stake.
    ///
    /// # Errors
    /// `ProposalNotFound` for an unknown id, `VotingClosed` once the window
    /// has elapsed, plus the ballot errors of `QuadraticVotingEngine::cast`.
    pub fn vote(
        &mut self,
        id: u64,
        voter: &Address,
        direction: VoteDirection,
        voter_stake: Amount,
        now: Timestamp,
    ) -> Result<VoteOutcome, AlmonerError> {
        let period = self.params.proposal_period_secs;
        let voting = self.voting;
        let proposal = self.proposal_mut(id)?;
        if proposal.status(now, period) != ProposalStatus::Open {
            return Err(AlmonerError::VotingClosed { id });
        }
        voting.cast(proposal, voter, direction, voter_stake)
    }

    /// Participation of `proposal` relative to `isqrt(total_staked)`, in
    /// basis points. Zero when nothing is staked.
    pub fn quorum_bps(&self, proposal: &Proposal, total_staked: Amount) -> Result<u128, AlmonerError> {
        let root = isqrt(total_staked);
        if root == 0 {
            return Ok(0);
        }
        mul_div(proposal.total_votes(), BPS_DENOMINATOR as u128, root, "quorum")
    }

    /// Resolve a proposal once its window has elapsed.
    ///
    /// Marks the proposal resolved whatever the outcome.
    ///
    /// # Errors
    /// `ProposalNotFound`, `ProposalOngoing` while open, `AlreadyResolved`
    /// on a second call.
    pub fn resolve(&mut self, id: u64, now: Timestamp, total_staked: Amount) -> Result<Resolution, AlmonerError> {
        let period = self.params.proposal_period_secs;
        let proposal = self.proposal(id)?;
        match proposal.status(now, period) {
            ProposalStatus::Open => {
                return Err(AlmonerError::ProposalOngoing {
                    id,
                    ends_at: proposal.ends_at(period),
                })
            }
            ProposalStatus::Resolved => return Err(AlmonerError::AlreadyResolved { id }),
            ProposalStatus::Resolvable => {}
        }

        let quorum_bps = self.quorum_bps(proposal, total_staked)?;
        let quorum_met = total_staked > 0 && quorum_bps >= self.params.quorum_bps as u128;
        let outcome = if !quorum_met && proposal.withdraw_amount > self.params.withdraw_threshold {
            ResolutionOutcome::Slash {
                proposer: proposal.proposer,
                withdraw_amount: proposal.withdraw_amount,
            }
        } else if quorum_met && proposal.total_for_votes > proposal.total_against_votes {
            ResolutionOutcome::Payout {
                recipient: proposal.withdraw_address,
                amount: proposal.withdraw_amount,
            }
        } else {
            ResolutionOutcome::NoAction
        };
        let (for_votes, against_votes) = (proposal.total_for_votes, proposal.total_against_votes);

        self.proposal_mut(id)?.resolved = true;

        tracing::info!(
            proposal_id = id,
            for_votes = %for_votes,
            against_votes = %against_votes,
            quorum_bps = %quorum_bps,
            quorum_met,
            outcome = ?outcome,
            "Proposal resolved"
        );
        Ok(Resolution {
            id,
            quorum_bps,
            quorum_met,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almoner_economics::token::tokens;

    const DAY: u64 = 24 * 60 * 60;

    fn alice() -> Address {
        Address::labelled("alice")
    }

    fn bob() -> Address {
        Address::labelled("bob")
    }

    fn request(amount: Amount) -> ProposalRequest {
        ProposalRequest {
            url: "https://forum.example/t/42".to_string(),
            title: "Security review".to_string(),
            withdraw_amount: amount,
            withdraw_address: alice(),
        }
    }

    fn registry() -> ProposalRegistry {
        ProposalRegistry::new(GovernanceParams::default())
    }

    #[test]
    fn test_propose_requires_minimum_stake() {
        let mut reg = registry();
        let err = reg.propose(&alice(), tokens(13), request(tokens(10)), 0).unwrap_err();
        assert!(matches!(err, AlmonerError::InsufficientStake { .. }));
        assert_eq!(reg.propose(&alice(), tokens(14), request(tokens(10)), 0).unwrap(), 0);
        assert_eq!(reg.propose(&alice(), tokens(14), request(tokens(10)), 5).unwrap(), 1);
        assert_eq!(reg.proposal_count(), 2);
        assert_eq!(reg.proposal(1).unwrap().start, 5);
    }

    #[test]
    fn test_vote_unknown_id_fails() {
        let mut reg = registry();
        assert!(matches!(
            reg.vote(0, &alice(), VoteDirection::For, tokens(1), 0),
            Err(AlmonerError::ProposalNotFound { id: 0 })
        ));
    }

    #[test]
    fn test_vote_after_window_fails() {
        let mut reg = registry();
        reg.propose(&alice(), tokens(100), request(tokens(10)), 0).unwrap();
        assert!(matches!(
            reg.vote(0, &bob(), VoteDirection::For, tokens(1), 2 * DAY),
            Err(AlmonerError::VotingClosed { id: 0 })
        ));
    }

    #[test]
    fn test_resolve_guards() {
        let mut reg = registry();
        reg.propose(&alice(), tokens(100), request(tokens(10)), 0).unwrap();
        assert!(matches!(
            reg.resolve(0, DAY, tokens(100)),
            Err(AlmonerError::ProposalOngoing { id: 0, ends_at }) if ends_at == 2 * DAY
        ));
        assert!(matches!(
            reg.resolve(1, 3 * DAY, tokens(100)),
            Err(AlmonerError::ProposalNotFound { id: 1 })
        ));
        reg.resolve(0, 2 * DAY, tokens(100)).unwrap();
        assert!(matches!(
            reg.resolve(0, 3 * DAY, tokens(100)),
            Err(AlmonerError::AlreadyResolved { id: 0 })
        ));
        assert_eq!(reg.status(0, 3 * DAY).unwrap(), ProposalStatus::Resolved);
    }

    #[test]
    fn test_passing_proposal_pays_out() {
        let mut reg = registry();
        reg.propose(&alice(), tokens(100), request(tokens(10)), 0).unwrap();
        reg.vote(0, &alice(), VoteDirection::For, tokens(100), 0).unwrap();
        reg.vote(0, &bob(), VoteDirection::Against, tokens(9), 0).unwrap();

        let resolution = reg.resolve(0, 2 * DAY, tokens(109)).unwrap();
        assert!(resolution.quorum_met);
        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::Payout {
                recipient: alice(),
                amount: tokens(10)
            }
        );
    }

    #[test]
    fn test_under_quorum_small_request_does_nothing() {
        let mut reg = registry();
        reg.propose(&alice(), tokens(900), request(tokens(10)), 0).unwrap();
        reg.vote(0, &alice(), VoteDirection::For, tokens(900), 0).unwrap();
        reg.vote(0, &bob(), VoteDirection::Against, tokens(25), 0).unwrap();

        // 35e9 * 10000 / isqrt(15925e18) ~ 2773 bps
        let resolution = reg.resolve(0, 2 * DAY, tokens(15_925)).unwrap();
        assert_eq!(resolution.quorum_bps, 2773);
        assert!(!resolution.quorum_met);
        assert_eq!(resolution.outcome, ResolutionOutcome::NoAction);
        assert!(reg.proposal(0).unwrap().resolved);
    }

    #[test]
    fn test_against_majority_does_nothing() {
        let mut reg = registry();
        reg.propose(&alice(), tokens(100), request(tokens(10)), 0).unwrap();
        reg.vote(0, &alice(), VoteDirection::For, tokens(100), 0).unwrap();
        reg.vote(0, &bob(), VoteDirection::Against, tokens(400), 0).unwrap();
        let resolution = reg.resolve(0, 2 * DAY, tokens(500)).unwrap();
        assert!(resolution.quorum_met);
        assert_eq!(resolution.outcome, ResolutionOutcome::NoAction);
    }

    #[test]
    fn test_under_quorum_large_request_slashes() {
        let mut reg = registry();
        reg.propose(&alice(), tokens(100), request(tokens(1001)), 0).unwrap();
        let resolution = reg.resolve(0, 2 * DAY, tokens(50_125)).unwrap();
        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::Slash {
                proposer: alice(),
                withdraw_amount: tokens(1001)
            }
        );
    }

    #[test]
    fn test_nothing_staked_means_no_quorum() {
        let mut reg = registry();
        reg.propose(&alice(), tokens(100), request(tokens(10)), 0).unwrap();
        let resolution = reg.resolve(0, 2 * DAY, 0).unwrap();
        assert_eq!(resolution.quorum_bps, 0);
        assert!(!resolution.quorum_met);
        assert_eq!(resolution.outcome, ResolutionOutcome::NoAction);
    }
}
