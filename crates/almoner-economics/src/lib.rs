// crates/almoner-economics/src/lib.rs
//
// almoner-economics: Stake ledger, streaming rewards, slashing, and the
// multi-asset treasury for the Almoner engine.
//
// Money flows in a loop:
//   - stakers lock the reward asset in the StakeLedger
//   - the TreasuryLedger splits every inflow into eco fund and operating
//   - `reward_voters` sweeps the operating reward balance into the
//     RewardDistributor, which streams it back to stakers pro rata

pub mod conversion;
pub mod rewards;
pub mod slashing;
pub mod staking;
pub mod token;
pub mod treasury;

pub use conversion::{validate_path, ConversionTarget};
pub use rewards::{RewardAccount, RewardDistributor, RewardEpoch};
pub use slashing::{SlashCondition, SlashResult};
pub use staking::{Participant, StakeLedger, StakeReceipt, StakingParams};
pub use token::{tokens, Units, WAD};
pub use treasury::{Conversion, TreasuryAccount, TreasuryLedger, TreasuryParams, TreasuryWiring};
