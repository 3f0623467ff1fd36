// crates/almoner-economics/src/treasury.rs
//
// Multi-asset treasury for the Almoner engine.
//
// The treasury receives:
//   - Deposits of any asset from any caller
//   - All slashed stake (as an inflow of the reward asset)
//
// Every inflow is split: `fund_percentage` basis points go to the eco fund
// of that asset, the remainder (including rounding dust) to its operating
// balance. For every asset:
//
//   operating_balance + eco_fund_balance == units custodied by the treasury
//
// The operating balance of the settlement asset pays approved proposals
// (governance only). The operating balance of the reward asset is swept into
// the reward distributor by `reward_voters`. Surplus assets are converted
// into either canonical asset through the swap router.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use almoner_core::binding::WriteOnce;
use almoner_core::error::{AlmonerError, Role};
use almoner_core::identity::{Address, AssetId};
use almoner_core::math::bps_share;
use almoner_core::traits::{CredentialLedger, RewardFunding, SwapRouter};
use almoner_core::{Amount, Timestamp};

use crate::conversion::{validate_path, ConversionTarget};
use crate::token::Units;

/// Upper bound on the eco-fund cut, in basis points (15%).
pub const MAX_FUND_PERCENTAGE: u32 = 1_500;

/// Upper bound on the burn percentage, in basis points (100%).
pub const MAX_BURN_PERCENTAGE: u32 = 10_000;

/// Default eco-fund cut: 5%.
pub const DEFAULT_FUND_PERCENTAGE: u32 = 500;

/// Per-asset split of the custodied balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryAccount {
    pub operating_balance: Amount,
    pub eco_fund_balance: Amount,
}

impl TreasuryAccount {
    /// Units of this asset the treasury should be holding.
    pub fn custodied(&self) -> Amount {
        self.operating_balance + self.eco_fund_balance
    }
}

/// Fee-split parameters, both in basis points of 10000.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryParams {
    #[serde(default = "default_fund_percentage")]
    pub fund_percentage: u32,

    /// Stored and capped; burning is left to the strategy layer.
    #[serde(default)]
    pub burn_percentage: u32,
}

fn default_fund_percentage() -> u32 {
    DEFAULT_FUND_PERCENTAGE
}

impl Default for TreasuryParams {
    fn default() -> Self {
        Self {
            fund_percentage: default_fund_percentage(),
            burn_percentage: 0,
        }
    }
}

impl TreasuryParams {
    /// Enforce both percentage caps.
    pub fn validate(&self) -> Result<(), AlmonerError> {
        check_cap(self.fund_percentage, MAX_FUND_PERCENTAGE)?;
        check_cap(self.burn_percentage, MAX_BURN_PERCENTAGE)
    }
}

fn check_cap(value: u32, max: u32) -> Result<(), AlmonerError> {
    if value > max {
        return Err(AlmonerError::ExceedsMaxPercent { value, max });
    }
    Ok(())
}

/// Canonical assets and collaborator addresses the treasury is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryWiring {
    /// The treasury's own account on the credential ledger.
    pub address: Address,
    /// Administrator of setters, conversions, and the eco fund.
    pub owner: Address,
    /// Asset proposals are paid out in.
    pub settlement_asset: AssetId,
    /// Staking and reward asset.
    pub reward_asset: AssetId,
    /// Account that receives swept rewards (the staking custody).
    pub reward_distributor: Address,
    /// Router allowed to pull conversion inputs.
    pub swap_router: Address,
    /// Recipient of eco-fund withdrawals.
    pub eco_fund: Address,
}

/// Outcome of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub source: AssetId,
    pub destination: AssetId,
    pub amount_in: Amount,
    pub amount_out: Amount,
}

/// The treasury ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryLedger {
    address: Address,
    owner: Address,
    settlement_asset: AssetId,
    reward_asset: AssetId,
    reward_distributor: Address,
    swap_router: Address,
    eco_fund: Address,
    gov: WriteOnce<Address>,
    params: TreasuryParams,
    accounts: HashMap<AssetId, TreasuryAccount>,
}

impl TreasuryLedger {
    /// Create an empty treasury.
    ///
    /// # Errors
    /// Returns `AlmonerError::ExceedsMaxPercent` if `params` breaks a cap.
    pub fn new(wiring: TreasuryWiring, params: TreasuryParams) -> Result<Self, AlmonerError> {
        params.validate()?;
        Ok(Self {
            address: wiring.address,
            owner: wiring.owner,
            settlement_asset: wiring.settlement_asset,
            reward_asset: wiring.reward_asset,
            reward_distributor: wiring.reward_distributor,
            swap_router: wiring.swap_router,
            eco_fund: wiring.eco_fund,
            gov: WriteOnce::new(),
            params,
            accounts: HashMap::new(),
        })
    }

    fn require_owner(&self, caller: &Address) -> Result<(), AlmonerError> {
        if *caller != self.owner {
            return Err(AlmonerError::Unauthorized { role: Role::Owner });
        }
        Ok(())
    }

    fn account_mut(&mut self, asset: &AssetId) -> &mut TreasuryAccount {
        self.accounts.entry(*asset).or_default()
    }

    // -- views -----------------------------------------------------------

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn settlement_asset(&self) -> &AssetId {
        &self.settlement_asset
    }

    pub fn reward_asset(&self) -> &AssetId {
        &self.reward_asset
    }

    pub fn reward_distributor(&self) -> &Address {
        &self.reward_distributor
    }

    pub fn swap_router(&self) -> &Address {
        &self.swap_router
    }

    pub fn eco_fund(&self) -> &Address {
        &self.eco_fund
    }

    /// The bound governance module, if any.
    pub fn gov(&self) -> Option<&Address> {
        self.gov.get()
    }

    pub fn fund_percentage(&self) -> u32 {
        self.params.fund_percentage
    }

    pub fn burn_percentage(&self) -> u32 {
        self.params.burn_percentage
    }

    pub fn account(&self, asset: &AssetId) -> TreasuryAccount {
        self.accounts.get(asset).copied().unwrap_or_default()
    }

    /// Operating balance of `asset`.
    pub fn balance_of(&self, asset: &AssetId) -> Amount {
        self.account(asset).operating_balance
    }

    pub fn eco_fund_balance(&self, asset: &AssetId) -> Amount {
        self.account(asset).eco_fund_balance
    }

    // -- inflows ---------------------------------------------------------

    /// Split an inflow that has already arrived in custody.
    ///
    /// Returns `(eco_cut, operating_cut)`. The eco cut rounds down.
    pub fn credit_inflow(&mut self, asset: &AssetId, amount: Amount) -> Result<(Amount, Amount), AlmonerError> {
        let eco_cut = bps_share(amount, self.params.fund_percentage);
        let operating_cut = amount - eco_cut;
        let account = self.account_mut(asset);
        let eco_fund_balance = account
            .eco_fund_balance
            .checked_add(eco_cut)
            .ok_or(AlmonerError::Overflow("eco fund balance"))?;
        let operating_balance = account
            .operating_balance
            .checked_add(operating_cut)
            .ok_or(AlmonerError::Overflow("operating balance"))?;
        account.eco_fund_balance = eco_fund_balance;
        account.operating_balance = operating_balance;
        Ok((eco_cut, operating_cut))
    }

    /// Pull `amount` of `asset` from `from` and split it.
    ///
    /// `from` must have approved the treasury address.
    pub fn deposit<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        from: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(Amount, Amount), AlmonerError> {
        if amount == 0 {
            return Err(AlmonerError::ZeroAmount);
        }
        let split = self.credit_inflow(asset, amount)?;
        ledger.transfer_from(asset, &self.address, from, &self.address, amount)?;
        tracing::info!(
            from = %from,
            asset = %asset,
            amount = %Units(amount),
            eco_cut = %Units(split.0),
            "Treasury deposit"
        );
        Ok(split)
    }

    // -- outflows --------------------------------------------------------

    /// Pay `amount` of the settlement asset to `recipient`.
    ///
    /// # Errors
    /// Returns `AlmonerError::Unauthorized` unless `caller` is the bound
    /// governance module, and `AlmonerError::InsufficientFunds` if the
    /// operating balance cannot cover `amount`.
    pub fn withdraw<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
        recipient: &Address,
    ) -> Result<(), AlmonerError> {
        if self.gov.get() != Some(caller) {
            return Err(AlmonerError::Unauthorized {
                role: Role::Governance,
            });
        }
        let asset = self.settlement_asset;
        let available = self.balance_of(&asset);
        if amount > available {
            return Err(AlmonerError::InsufficientFunds {
                asset,
                requested: amount,
                available,
            });
        }
        self.account_mut(&asset).operating_balance -= amount;
        ledger.transfer(&asset, &self.address, recipient, amount)?;
        tracing::info!(
            recipient = %recipient,
            amount = %Units(amount),
            "Treasury payout"
        );
        Ok(())
    }

    /// Pay `amount` of `asset`'s eco fund to the eco-fund recipient.
    pub fn withdraw_eco_fund<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), AlmonerError> {
        self.require_owner(caller)?;
        let available = self.eco_fund_balance(asset);
        if amount > available {
            return Err(AlmonerError::InsufficientFunds {
                asset: *asset,
                requested: amount,
                available,
            });
        }
        self.account_mut(asset).eco_fund_balance -= amount;
        ledger.transfer(asset, &self.address, &self.eco_fund, amount)?;
        tracing::info!(
            asset = %asset,
            amount = %Units(amount),
            recipient = %self.eco_fund,
            "Eco fund withdrawn"
        );
        Ok(())
    }

    /// Sweep the whole operating balance of the reward asset into the
    /// reward distributor and start a new epoch with it.
    ///
    /// Returns the amount swept; an empty balance is a no-op.
    pub fn reward_voters<L: CredentialLedger, F: RewardFunding>(
        &mut self,
        ledger: &mut L,
        distributor: &mut F,
        now: Timestamp,
    ) -> Result<Amount, AlmonerError> {
        let asset = self.reward_asset;
        let amount = self.balance_of(&asset);
        if amount == 0 {
            tracing::debug!("No reward balance to sweep");
            return Ok(0);
        }
        self.account_mut(&asset).operating_balance = 0;
        distributor.notify_reward_amount(&self.address, amount, now)?;
        ledger.transfer(&asset, &self.address, &self.reward_distributor, amount)?;
        tracing::info!(amount = %Units(amount), "Voters rewarded");
        Ok(amount)
    }

    // -- conversion ------------------------------------------------------

    /// Convert `amount_in` of `path[0]` into the settlement asset.
    pub fn convert_to_default_token<L: CredentialLedger, R: SwapRouter>(
        &mut self,
        ledger: &mut L,
        router: &mut R,
        caller: &Address,
        path: &[AssetId],
        amount_in: Amount,
    ) -> Result<Conversion, AlmonerError> {
        self.convert(ledger, router, caller, path, amount_in, ConversionTarget::SettlementAsset)
    }

    /// Convert `amount_in` of `path[0]` into the reward asset.
    pub fn convert_to_boost_token<L: CredentialLedger, R: SwapRouter>(
        &mut self,
        ledger: &mut L,
        router: &mut R,
        caller: &Address,
        path: &[AssetId],
        amount_in: Amount,
    ) -> Result<Conversion, AlmonerError> {
        self.convert(ledger, router, caller, path, amount_in, ConversionTarget::RewardAsset)
    }

    fn convert<L: CredentialLedger, R: SwapRouter>(
        &mut self,
        ledger: &mut L,
        router: &mut R,
        caller: &Address,
        path: &[AssetId],
        amount_in: Amount,
        target: ConversionTarget,
    ) -> Result<Conversion, AlmonerError> {
        self.require_owner(caller)?;
        let (source, destination) =
            validate_path(path, target, &self.settlement_asset, &self.reward_asset)?;
        let available = self.balance_of(&source);
        if amount_in > available {
            return Err(AlmonerError::InsufficientFunds {
                asset: source,
                requested: amount_in,
                available,
            });
        }
        if amount_in == 0 {
            return Err(AlmonerError::ZeroAmount);
        }
        if router.address() != self.swap_router {
            return Err(AlmonerError::Collaborator(format!(
                "router {} is not the configured swap router {}",
                router.address(),
                self.swap_router
            )));
        }

        self.account_mut(&source).operating_balance -= amount_in;

        let before = ledger.balance_of(&destination, &self.address);
        ledger.approve(&source, &self.address, &self.swap_router, amount_in)?;
        let swapped = router.swap_exact_input(ledger, &self.address, path, amount_in, &self.address);
        // The router holds no standing allowance over treasury funds
        ledger.approve(&source, &self.address, &self.swap_router, 0)?;
        swapped?;
        let after = ledger.balance_of(&destination, &self.address);

        let amount_out = after.saturating_sub(before);
        if amount_out == 0 {
            tracing::warn!(
                source = %source,
                destination = %destination,
                amount_in = %Units(amount_in),
                "Conversion produced no output"
            );
        }
        let account = self.account_mut(&destination);
        account.operating_balance = account
            .operating_balance
            .checked_add(amount_out)
            .ok_or(AlmonerError::Overflow("operating balance"))?;

        tracing::info!(
            source = %source,
            destination = %destination,
            amount_in = %Units(amount_in),
            amount_out = %Units(amount_out),
            "Treasury conversion"
        );
        Ok(Conversion {
            source,
            destination,
            amount_in,
            amount_out,
        })
    }

    // -- administration --------------------------------------------------

    /// Bind the governance module. Succeeds exactly once, and only for the
    /// owner.
    pub fn set_gov(&mut self, caller: &Address, gov: Address) -> Result<(), AlmonerError> {
        if *caller != self.owner {
            return Err(AlmonerError::GovernanceBindingRefused);
        }
        self.gov.set(gov)?;
        tracing::info!(gov = %gov, "Governance bound to treasury");
        Ok(())
    }

    pub fn set_swap_router(&mut self, caller: &Address, router: Address) -> Result<(), AlmonerError> {
        self.require_owner(caller)?;
        self.swap_router = router;
        tracing::info!(router = %router, "Swap router updated");
        Ok(())
    }

    pub fn set_eco_fund(&mut self, caller: &Address, eco_fund: Address) -> Result<(), AlmonerError> {
        self.require_owner(caller)?;
        self.eco_fund = eco_fund;
        tracing::info!(eco_fund = %eco_fund, "Eco fund recipient updated");
        Ok(())
    }

    pub fn set_fund_percentage(&mut self, caller: &Address, value: u32) -> Result<(), AlmonerError> {
        self.require_owner(caller)?;
        check_cap(value, MAX_FUND_PERCENTAGE)?;
        self.params.fund_percentage = value;
        tracing::info!(fund_percentage = value, "Fund percentage updated");
        Ok(())
    }

    pub fn set_burn_percentage(&mut self, caller: &Address, value: u32) -> Result<(), AlmonerError> {
        self.require_owner(caller)?;
        check_cap(value, MAX_BURN_PERCENTAGE)?;
        self.params.burn_percentage = value;
        tracing::info!(burn_percentage = value, "Burn percentage updated");
        Ok(())
    }
}
