// crates/almoner-core/src/error.rs

use std::fmt;

use thiserror::Error;

use crate::identity::AssetId;
use crate::{Amount, Timestamp};

/// Privileged roles checked by the ledgers before mutating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The treasury owner (administrative setters, eco fund, conversions).
    Owner,
    /// The governance module bound to the treasury via `set_gov`.
    Governance,
    /// The single funding source allowed to notify new reward epochs.
    RewardSource,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Governance => write!(f, "gov"),
            Role::RewardSource => write!(f, "reward source"),
        }
    }
}

/// Coarse classification of failures.
///
/// Every error is abort-and-revert; the kind only tells the caller whether
/// retrying makes sense (`State` errors may clear with time, `Validation`
/// errors need corrected input, `Authorization` errors need another caller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    State,
    Validation,
    External,
}

/// Engine-wide error type.
#[derive(Debug, Error)]
pub enum AlmonerError {
    // -- authorization ---------------------------------------------------
    #[error("not {role}: caller lacks the required role")]
    Unauthorized { role: Role },

    #[error("not authorized: governance is already bound")]
    GovernanceAlreadyBound,

    #[error("not authorized: only the owner binds governance")]
    GovernanceBindingRefused,

    // -- state -----------------------------------------------------------
    #[error("tokens locked until {until}")]
    TokensLocked { until: Timestamp },

    #[error("non-existent proposal {id}")]
    ProposalNotFound { id: u64 },

    #[error("ongoing proposal {id}: voting ends at {ends_at}")]
    ProposalOngoing { id: u64, ends_at: Timestamp },

    #[error("proposal {id} already resolved")]
    AlreadyResolved { id: u64 },

    #[error("voting closed for proposal {id}")]
    VotingClosed { id: u64 },

    #[error("cannot switch votes on proposal {id}")]
    CannotSwitchVotes { id: u64 },

    #[error("clock went backwards: last observed {last}, got {now}")]
    ClockRegression { last: Timestamp, now: Timestamp },

    // -- validation ------------------------------------------------------
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("stake more boost: have {have}, need {need}")]
    InsufficientStake { have: Amount, need: Amount },

    #[error("insufficient staked balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("insufficient funds of {asset}: requested {requested}, available {available}")]
    InsufficientFunds {
        asset: AssetId,
        requested: Amount,
        available: Amount,
    },

    #[error("exceed max percent: {value} > {max}")]
    ExceedsMaxPercent { value: u32, max: u32 },

    #[error("src can't be boost")]
    SourceIsRewardAsset,

    #[error("src can't be defaultToken")]
    SourceIsSettlementAsset,

    #[error("dest not {expected}: path ends in {found}")]
    DestinationMismatch { expected: AssetId, found: AssetId },

    #[error("conversion path needs at least two assets, got {len}")]
    InvalidPath { len: usize },

    #[error("voter has no staked weight")]
    NoVotingWeight,

    // -- external --------------------------------------------------------
    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AlmonerError {
    /// Classify this error into the authorization/state/validation taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlmonerError::Unauthorized { .. }
            | AlmonerError::GovernanceAlreadyBound
            | AlmonerError::GovernanceBindingRefused => ErrorKind::Authorization,
            AlmonerError::TokensLocked { .. }
            | AlmonerError::ProposalNotFound { .. }
            | AlmonerError::ProposalOngoing { .. }
            | AlmonerError::AlreadyResolved { .. }
            | AlmonerError::VotingClosed { .. }
            | AlmonerError::CannotSwitchVotes { .. }
            | AlmonerError::ClockRegression { .. } => ErrorKind::State,
            AlmonerError::ZeroAmount
            | AlmonerError::InsufficientStake { .. }
            | AlmonerError::InsufficientBalance { .. }
            | AlmonerError::InsufficientFunds { .. }
            | AlmonerError::ExceedsMaxPercent { .. }
            | AlmonerError::SourceIsRewardAsset
            | AlmonerError::SourceIsSettlementAsset
            | AlmonerError::DestinationMismatch { .. }
            | AlmonerError::InvalidPath { .. }
            | AlmonerError::NoVotingWeight => ErrorKind::Validation,
            AlmonerError::Collaborator(_)
            | AlmonerError::Overflow(_)
            | AlmonerError::Config(_)
            | AlmonerError::Serialization(_) => ErrorKind::External,
        }
    }
}

impl From<serde_json::Error> for AlmonerError {
    fn from(e: serde_json::Error) -> Self {
        AlmonerError::Serialization(e.to_string())
    }
}
