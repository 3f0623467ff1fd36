// crates/almoner-governance/src/voting.rs
//
// Quadratic vote crediting.
//
// weight(p) = isqrt(staked(p)) at the moment of the call.
//
// A ballot remembers the weight already credited, so re-voting after
// staking more adds only the difference:
//
//   tally += isqrt(new_stake) - credited_weight
//
// Tallies never decrease: a re-vote with weight at or below the credited
// weight adds nothing.

use almoner_core::error::AlmonerError;
use almoner_core::identity::Address;
use almoner_core::math::isqrt;
use almoner_core::Amount;

use crate::proposal::{Ballot, Proposal, VoteDirection};

/// Result of crediting one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub direction: VoteDirection,
    /// Voter's full quadratic weight at call time.
    pub weight: u128,
    /// Amount actually added to the tally by this call.
    pub credited: u128,
    /// The side's tally after the call.
    pub tally: u128,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuadraticVotingEngine;

impl QuadraticVotingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Quadratic weight of a raw stake.
    pub fn weight(&self, staked: Amount) -> u128 {
        isqrt(staked)
    }

    /// Credit `voter`'s vote on `proposal`.
    ///
    /// Window and existence checks belong to the caller; this only enforces
    /// the ballot rules.
    ///
    /// # Errors
    /// `CannotSwitchVotes` if the voter already voted the other way,
    /// `NoVotingWeight` if the voter has nothing staked.
    pub fn cast(
        &self,
        proposal: &mut Proposal,
        voter: &Address,
        direction: VoteDirection,
        staked: Amount,
    ) -> Result<VoteOutcome, AlmonerError> {
        let previous = proposal.ballot(voter).copied();
        if let Some(ballot) = previous {
            if ballot.direction != direction {
                return Err(AlmonerError::CannotSwitchVotes { id: proposal.id });
            }
        }
        let weight = self.weight(staked);
        if weight == 0 {
            return Err(AlmonerError::NoVotingWeight);
        }

        let already = previous.map_or(0, |b| b.credited_weight);
        let credited = weight.saturating_sub(already);
        let tally = match direction {
            VoteDirection::For => &mut proposal.total_for_votes,
            VoteDirection::Against => &mut proposal.total_against_votes,
        };
        *tally = tally
            .checked_add(credited)
            .ok_or(AlmonerError::Overflow("vote tally"))?;
        let tally = *tally;

        proposal.ballots.insert(
            *voter,
            Ballot {
                direction,
                credited_weight: already.max(weight),
            },
        );

        tracing::debug!(
            proposal_id = proposal.id,
            voter = %voter,
            direction = ?direction,
            weight = %weight,
            credited = %credited,
            "Vote credited"
        );
        Ok(VoteOutcome {
            direction,
            weight,
            credited,
            tally,
        })
    }
}
