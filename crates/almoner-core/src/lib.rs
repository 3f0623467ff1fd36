// crates/almoner-core/src/lib.rs
//
// almoner-core: Core identities, error types, collaborator traits, and
// integer math for the Almoner staking-governance-treasury engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// Every amount is an integer count of the smallest unit; every instant is a
// host-supplied Unix timestamp in seconds.

pub mod binding;
pub mod error;
pub mod identity;
pub mod math;
pub mod memory;
pub mod traits;

/// An amount of any fungible asset, in its smallest unit.
pub type Amount = u128;

/// Host-supplied wall clock, seconds since the Unix epoch.
pub type Timestamp = u64;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use almoner_core::Address;`
pub use binding::WriteOnce;
pub use error::{AlmonerError, ErrorKind, Role};
pub use identity::{Address, AssetId};
pub use memory::{InMemoryLedger, InMemoryRouter};
pub use traits::{CredentialLedger, RewardFunding, SwapRouter};

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, AlmonerError>;
