// crates/almoner-governance/src/lib.rs
//
// almoner-governance: Stake-gated funding proposals with quadratic voting
// and quorum-based resolution.
//
// Voting weight is the integer square root of the voter's stake. The
// registry only decides; slashing and payouts are applied by the engine.

pub mod params;
pub mod proposal;
pub mod registry;
pub mod voting;

pub use params::GovernanceParams;
pub use proposal::{Ballot, Proposal, ProposalStatus, VoteDirection};
pub use registry::{ProposalRegistry, ProposalRequest, Resolution, ResolutionOutcome};
pub use voting::{QuadraticVotingEngine, VoteOutcome};
