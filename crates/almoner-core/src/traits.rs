// crates/almoner-core/src/traits.rs

use crate::error::AlmonerError;
use crate::identity::{Address, AssetId};
use crate::{Amount, Timestamp};

/// The fungible-credential ledger the engine custodies assets on.
///
/// The engine relies only on these five operations. Every mutating call
/// must be all-or-nothing: on `Err` no balance or allowance changed.
///
/// Implemented in-process by `memory::InMemoryLedger`.
pub trait CredentialLedger {
    /// Balance of `holder` in `asset`.
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> Amount;

    /// Remaining amount `spender` may move out of `owner`'s balance.
    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> Amount;

    /// Set `spender`'s allowance over `owner`'s balance to `amount`.
    fn approve(
        &mut self,
        asset: &AssetId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), AlmonerError>;

    /// Move `amount` from `from` (the calling party) to `to`.
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AlmonerError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AlmonerError>;
}

/// External swap router used by treasury conversions.
///
/// Implemented in-process by `memory::InMemoryRouter`.
pub trait SwapRouter {
    /// The router's own identity; the payer approves this address before
    /// a swap.
    fn address(&self) -> Address;

    /// Swap exactly `amount_in` of `path[0]` along `path`, pulling the input
    /// from `payer` through its allowance and delivering the output asset
    /// `path[last]` to `recipient`. Returns the output amount. No minimum
    /// output is enforced.
    fn swap_exact_input<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        payer: &Address,
        path: &[AssetId],
        amount_in: Amount,
        recipient: &Address,
    ) -> Result<Amount, AlmonerError>;
}

/// Receiver of reward funding.
///
/// Implemented by the staking ledger's reward distributor; called by the
/// treasury when it sweeps reward-asset inflows to stakers.
pub trait RewardFunding {
    /// Start (or extend) a reward epoch funded with `amount`.
    fn notify_reward_amount(
        &mut self,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), AlmonerError>;
}
