// crates/almoner-engine/src/engine.rs
//
// The Almoner aggregate: host-facing entry points over the stake ledger,
// the proposal registry, and the treasury.
//
// Every entry point takes the caller identity and (for time-dependent calls)
// the host clock. Calls are all-or-nothing: the internal state is cloned
// before the call and restored if it fails, and the call's events are
// dropped. Within a call, internal accounting is committed before the
// credential ledger or the router is touched.

use serde::Serialize;

use almoner_core::error::AlmonerError;
use almoner_core::identity::{Address, AssetId};
use almoner_core::math::U256;
use almoner_core::traits::{CredentialLedger, SwapRouter};
use almoner_core::{Amount, Timestamp};
use almoner_economics::rewards::RewardEpoch;
use almoner_economics::slashing::SlashCondition;
use almoner_economics::staking::{Participant, StakeLedger, StakeReceipt};
use almoner_economics::token::Units;
use almoner_economics::treasury::{Conversion, TreasuryAccount, TreasuryLedger, TreasuryWiring};
use almoner_governance::{
    Ballot, Proposal, ProposalRegistry, ProposalRequest, ProposalStatus, Resolution, ResolutionOutcome,
    VoteDirection, VoteOutcome,
};

use crate::config::AlmonerConfig;
use crate::events::{AlmonerEvent, Parameter, ResolutionKind};

/// Identities the engine is wired to at deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Treasury owner.
    pub owner: Address,
    /// The governance module's account: stake custody and the only caller
    /// allowed to draw treasury payouts once bound.
    pub governance: Address,
    /// The treasury's account.
    pub treasury: Address,
    /// Initial eco-fund recipient.
    pub eco_fund: Address,
    /// Staking and reward asset.
    pub stake_asset: AssetId,
    /// Asset proposals are paid out in.
    pub settlement_asset: AssetId,
}

/// All mutable engine state. Cloned as the rollback snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct EngineState {
    pub stakes: StakeLedger,
    pub registry: ProposalRegistry,
    pub treasury: TreasuryLedger,
    /// Latest host timestamp accepted.
    pub last_seen: Timestamp,
}

/// The engine, generic over the credential ledger and swap router it
/// drives.
pub struct Almoner<L, R> {
    governance: Address,
    state: EngineState,
    events: Vec<AlmonerEvent>,
    ledger: L,
    router: R,
}

impl<L: CredentialLedger, R: SwapRouter> Almoner<L, R> {
    /// Build an engine from validated configuration.
    ///
    /// The treasury starts unbound; the owner binds governance with
    /// `set_gov`.
    pub fn new(config: &AlmonerConfig, deployment: Deployment, ledger: L, router: R) -> Result<Self, AlmonerError> {
        config.validate()?;
        let stakes = StakeLedger::new(
            deployment.governance,
            deployment.stake_asset,
            deployment.treasury,
            config.staking.clone(),
        );
        let registry = ProposalRegistry::new(config.governance.clone());
        let treasury = TreasuryLedger::new(
            TreasuryWiring {
                address: deployment.treasury,
                owner: deployment.owner,
                settlement_asset: deployment.settlement_asset,
                reward_asset: deployment.stake_asset,
                reward_distributor: deployment.governance,
                swap_router: router.address(),
                eco_fund: deployment.eco_fund,
            },
            config.treasury.clone(),
        )?;
        tracing::info!(
            governance = %deployment.governance,
            treasury = %deployment.treasury,
            stake_asset = %deployment.stake_asset,
            settlement_asset = %deployment.settlement_asset,
            "Almoner engine initialised"
        );
        Ok(Self {
            governance: deployment.governance,
            state: EngineState {
                stakes,
                registry,
                treasury,
                last_seen: 0,
            },
            events: Vec::new(),
            ledger,
            router,
        })
    }

    /// Run `f` atomically. On error the internal state and the call's
    /// events are rolled back.
    fn transact<T>(
        &mut self,
        operation: &'static str,
        now: Option<Timestamp>,
        f: impl FnOnce(&mut Self) -> Result<T, AlmonerError>,
    ) -> Result<T, AlmonerError> {
        if let Some(now) = now {
            if now < self.state.last_seen {
                return Err(AlmonerError::ClockRegression {
                    last: self.state.last_seen,
                    now,
                });
            }
        }
        let snapshot = self.state.clone();
        let journal_len = self.events.len();
        match f(self) {
            Ok(value) => {
                if let Some(now) = now {
                    self.state.last_seen = now;
                }
                Ok(value)
            }
            Err(e) => {
                self.state = snapshot;
                self.events.truncate(journal_len);
                tracing::warn!(operation, error = %e, "Call rolled back");
                Err(e)
            }
        }
    }

    fn emit(&mut self, event: AlmonerEvent) {
        self.events.push(event);
    }

    fn emit_stake_receipt(&mut self, who: &Address, receipt: &StakeReceipt) {
        if receipt.reward_paid > 0 {
            self.emit(AlmonerEvent::RewardPaid {
                participant: *who,
                reward: receipt.reward_paid,
            });
        }
    }

    // -- staking -----------------------------------------------------------

    pub fn stake(&mut self, caller: &Address, amount: Amount, now: Timestamp) -> Result<StakeReceipt, AlmonerError> {
        self.transact("stake", Some(now), |this| {
            let receipt = this.state.stakes.stake(&mut this.ledger, caller, amount, now)?;
            let lock_expiry = this.state.stakes.lock_expiry(caller);
            this.emit(AlmonerEvent::Staked {
                participant: *caller,
                amount,
                lock_expiry,
            });
            this.emit_stake_receipt(caller, &receipt);
            Ok(receipt)
        })
    }

    pub fn withdraw(&mut self, caller: &Address, amount: Amount, now: Timestamp) -> Result<StakeReceipt, AlmonerError> {
        self.transact("withdraw", Some(now), |this| {
            let receipt = this.state.stakes.withdraw(&mut this.ledger, caller, amount, now)?;
            this.emit(AlmonerEvent::Withdrawn {
                participant: *caller,
                amount,
            });
            this.emit_stake_receipt(caller, &receipt);
            Ok(receipt)
        })
    }

    /// Pay out the caller's accrued reward.
    pub fn claim_reward(&mut self, caller: &Address, now: Timestamp) -> Result<Amount, AlmonerError> {
        self.transact("claim_reward", Some(now), |this| {
            let reward = this.state.stakes.claim_reward(&mut this.ledger, caller, now)?;
            if reward > 0 {
                this.emit(AlmonerEvent::RewardPaid {
                    participant: *caller,
                    reward,
                });
            }
            Ok(reward)
        })
    }

    /// Withdraw the caller's whole stake and claim the reward.
    pub fn exit(&mut self, caller: &Address, now: Timestamp) -> Result<StakeReceipt, AlmonerError> {
        self.transact("exit", Some(now), |this| {
            let receipt = this.state.stakes.exit(&mut this.ledger, caller, now)?;
            if receipt.amount > 0 {
                this.emit(AlmonerEvent::Withdrawn {
                    participant: *caller,
                    amount: receipt.amount,
                });
            }
            this.emit_stake_receipt(caller, &receipt);
            Ok(receipt)
        })
    }

    // -- governance --------------------------------------------------------

    pub fn propose(&mut self, caller: &Address, request: ProposalRequest, now: Timestamp) -> Result<u64, AlmonerError> {
        self.transact("propose", Some(now), |this| {
            let stake = this.state.stakes.balance_of(caller);
            let withdraw_amount = request.withdraw_amount;
            let withdraw_address = request.withdraw_address;
            let id = this.state.registry.propose(caller, stake, request, now)?;
            this.emit(AlmonerEvent::ProposalCreated {
                id,
                proposer: *caller,
                withdraw_amount,
                withdraw_address,
            });
            Ok(id)
        })
    }

    pub fn vote_for(&mut self, caller: &Address, id: u64, now: Timestamp) -> Result<VoteOutcome, AlmonerError> {
        self.vote(caller, id, VoteDirection::For, now)
    }

    pub fn vote_against(&mut self, caller: &Address, id: u64, now: Timestamp) -> Result<VoteOutcome, AlmonerError> {
        self.vote(caller, id, VoteDirection::Against, now)
    }

    fn vote(
        &mut self,
        caller: &Address,
        id: u64,
        direction: VoteDirection,
        now: Timestamp,
    ) -> Result<VoteOutcome, AlmonerError> {
        self.transact("vote", Some(now), |this| {
            let stake = this.state.stakes.balance_of(caller);
            let outcome = this.state.registry.vote(id, caller, direction, stake, now)?;
            this.state.stakes.extend_lock(caller, now);
            this.emit(AlmonerEvent::VoteCast {
                id,
                voter: *caller,
                direction,
                weight: outcome.weight,
                credited: outcome.credited,
            });
            Ok(outcome)
        })
    }

    /// Resolve a proposal whose window has elapsed and apply its outcome.
    ///
    /// Anyone may call this. A payout is drawn from the treasury by the
    /// governance account, so it fails (and the resolution with it) until
    /// governance is bound.
    pub fn resolve_proposal(&mut self, caller: &Address, id: u64, now: Timestamp) -> Result<Resolution, AlmonerError> {
        self.transact("resolve_proposal", Some(now), |this| {
            let total_staked = this.state.stakes.total_staked();
            let resolution = this.state.registry.resolve(id, now, total_staked)?;
            tracing::debug!(proposal_id = id, caller = %caller, "Applying resolution");

            match &resolution.outcome {
                ResolutionOutcome::Slash {
                    proposer,
                    withdraw_amount,
                } => {
                    let condition = SlashCondition::UnderQuorumProposal {
                        proposal_id: id,
                        withdraw_amount: *withdraw_amount,
                    };
                    let slashed = this.state.stakes.slash(proposer, condition, now)?;
                    let amount = slashed.amount_slashed;
                    if amount > 0 {
                        let asset = *this.state.stakes.asset();
                        let (eco_cut, _) = this.state.treasury.credit_inflow(&asset, amount)?;
                        let treasury = *this.state.treasury.address();
                        this.ledger.transfer(&asset, &this.governance, &treasury, amount)?;
                        this.emit(AlmonerEvent::StakeSlashed {
                            proposal_id: id,
                            offender: *proposer,
                            amount,
                        });
                        tracing::debug!(amount = %Units(amount), eco_cut = %Units(eco_cut), "Slashed stake moved to treasury");
                    }
                }
                ResolutionOutcome::Payout { recipient, amount } => {
                    let governance = this.governance;
                    this.state
                        .treasury
                        .withdraw(&mut this.ledger, &governance, *amount, recipient)?;
                    this.emit(AlmonerEvent::TreasuryPayout {
                        recipient: *recipient,
                        amount: *amount,
                    });
                }
                ResolutionOutcome::NoAction => {}
            }

            this.emit(AlmonerEvent::ProposalResolved {
                id,
                quorum_bps: resolution.quorum_bps,
                quorum_met: resolution.quorum_met,
                outcome: ResolutionKind::from(&resolution.outcome),
            });
            Ok(resolution)
        })
    }

    // -- treasury ----------------------------------------------------------

    /// Deposit `amount` of `asset` from the caller into the treasury.
    pub fn deposit(&mut self, caller: &Address, asset: &AssetId, amount: Amount) -> Result<(Amount, Amount), AlmonerError> {
        self.transact("deposit", None, |this| {
            let split = this.state.treasury.deposit(&mut this.ledger, caller, asset, amount)?;
            this.emit(AlmonerEvent::Deposited {
                from: *caller,
                asset: *asset,
                amount,
                eco_cut: split.0,
            });
            Ok(split)
        })
    }

    /// Direct treasury payout of the settlement asset. Only the bound
    /// governance account may call this.
    pub fn treasury_withdraw(&mut self, caller: &Address, amount: Amount, recipient: &Address) -> Result<(), AlmonerError> {
        self.transact("treasury_withdraw", None, |this| {
            this.state
                .treasury
                .withdraw(&mut this.ledger, caller, amount, recipient)?;
            this.emit(AlmonerEvent::TreasuryPayout {
                recipient: *recipient,
                amount,
            });
            Ok(())
        })
    }

    pub fn withdraw_eco_fund(&mut self, caller: &Address, asset: &AssetId, amount: Amount) -> Result<(), AlmonerError> {
        self.transact("withdraw_eco_fund", None, |this| {
            this.state
                .treasury
                .withdraw_eco_fund(&mut this.ledger, caller, asset, amount)?;
            let recipient = *this.state.treasury.eco_fund();
            this.emit(AlmonerEvent::EcoFundWithdrawn {
                asset: *asset,
                amount,
                recipient,
            });
            Ok(())
        })
    }

    /// Sweep the treasury's reward balance into a new reward epoch.
    /// Callable by anyone; returns the amount swept.
    pub fn reward_voters(&mut self, now: Timestamp) -> Result<Amount, AlmonerError> {
        self.transact("reward_voters", Some(now), |this| {
            let state = &mut this.state;
            let amount = state
                .treasury
                .reward_voters(&mut this.ledger, &mut state.stakes, now)?;
            if amount > 0 {
                let period_finish = this.state.stakes.distributor().epoch().period_finish;
                this.emit(AlmonerEvent::RewardAdded {
                    amount,
                    period_finish,
                });
            }
            Ok(amount)
        })
    }

    pub fn convert_to_default_token(
        &mut self,
        caller: &Address,
        path: &[AssetId],
        amount_in: Amount,
    ) -> Result<Conversion, AlmonerError> {
        self.transact("convert_to_default_token", None, |this| {
            let conversion = this.state.treasury.convert_to_default_token(
                &mut this.ledger,
                &mut this.router,
                caller,
                path,
                amount_in,
            )?;
            this.emit_conversion(&conversion);
            Ok(conversion)
        })
    }

    pub fn convert_to_boost_token(
        &mut self,
        caller: &Address,
        path: &[AssetId],
        amount_in: Amount,
    ) -> Result<Conversion, AlmonerError> {
        self.transact("convert_to_boost_token", None, |this| {
            let conversion = this.state.treasury.convert_to_boost_token(
                &mut this.ledger,
                &mut this.router,
                caller,
                path,
                amount_in,
            )?;
            this.emit_conversion(&conversion);
            Ok(conversion)
        })
    }

    fn emit_conversion(&mut self, conversion: &Conversion) {
        self.emit(AlmonerEvent::Converted {
            source: conversion.source,
            destination: conversion.destination,
            amount_in: conversion.amount_in,
            amount_out: conversion.amount_out,
        });
    }

    // -- administration ----------------------------------------------------

    pub fn set_gov(&mut self, caller: &Address, gov: Address) -> Result<(), AlmonerError> {
        self.transact("set_gov", None, |this| {
            this.state.treasury.set_gov(caller, gov)?;
            this.emit(AlmonerEvent::GovernanceBound { gov });
            Ok(())
        })
    }

    pub fn set_swap_router(&mut self, caller: &Address, router: Address) -> Result<(), AlmonerError> {
        self.transact("set_swap_router", None, |this| {
            this.state.treasury.set_swap_router(caller, router)?;
            this.emit(AlmonerEvent::ParameterChanged {
                parameter: Parameter::SwapRouter(router),
            });
            Ok(())
        })
    }

    pub fn set_eco_fund(&mut self, caller: &Address, eco_fund: Address) -> Result<(), AlmonerError> {
        self.transact("set_eco_fund", None, |this| {
            this.state.treasury.set_eco_fund(caller, eco_fund)?;
            this.emit(AlmonerEvent::ParameterChanged {
                parameter: Parameter::EcoFund(eco_fund),
            });
            Ok(())
        })
    }

    pub fn set_fund_percentage(&mut self, caller: &Address, value: u32) -> Result<(), AlmonerError> {
        self.transact("set_fund_percentage", None, |this| {
            this.state.treasury.set_fund_percentage(caller, value)?;
            this.emit(AlmonerEvent::ParameterChanged {
                parameter: Parameter::FundPercentage(value),
            });
            Ok(())
        })
    }

    pub fn set_burn_percentage(&mut self, caller: &Address, value: u32) -> Result<(), AlmonerError> {
        self.transact("set_burn_percentage", None, |this| {
            this.state.treasury.set_burn_percentage(caller, value)?;
            this.emit(AlmonerEvent::ParameterChanged {
                parameter: Parameter::BurnPercentage(value),
            });
            Ok(())
        })
    }

    // -- views: staking and rewards ---------------------------------------

    pub fn balance_of(&self, who: &Address) -> Amount {
        self.state.stakes.balance_of(who)
    }

    pub fn lock_expiry(&self, who: &Address) -> Timestamp {
        self.state.stakes.lock_expiry(who)
    }

    pub fn participant(&self, who: &Address) -> Option<&Participant> {
        self.state.stakes.participant(who)
    }

    pub fn total_staked(&self) -> Amount {
        self.state.stakes.total_staked()
    }

    pub fn earned(&self, who: &Address, now: Timestamp) -> Result<Amount, AlmonerError> {
        self.state.stakes.earned(who, now)
    }

    pub fn reward_per_token(&self, now: Timestamp) -> Result<U256, AlmonerError> {
        self.state.stakes.reward_per_token(now)
    }

    pub fn last_time_reward_applicable(&self, now: Timestamp) -> Timestamp {
        self.state.stakes.distributor().last_time_reward_applicable(now)
    }

    pub fn reward_epoch(&self) -> &RewardEpoch {
        self.state.stakes.distributor().epoch()
    }

    pub fn reward_rate(&self) -> Amount {
        self.reward_epoch().reward_rate
    }

    pub fn period_finish(&self) -> Timestamp {
        self.reward_epoch().period_finish
    }

    // -- views: governance -------------------------------------------------

    pub fn proposal(&self, id: u64) -> Result<&Proposal, AlmonerError> {
        self.state.registry.proposal(id)
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.registry.proposal_count()
    }

    pub fn proposal_status(&self, id: u64, now: Timestamp) -> Result<ProposalStatus, AlmonerError> {
        self.state.registry.status(id, now)
    }

    pub fn ballot(&self, id: u64, voter: &Address) -> Result<Option<Ballot>, AlmonerError> {
        self.state.registry.ballot(id, voter)
    }

    // -- views: treasury ---------------------------------------------------

    pub fn treasury(&self) -> &TreasuryLedger {
        &self.state.treasury
    }

    /// Operating balance of `asset` in the treasury.
    pub fn treasury_balance_of(&self, asset: &AssetId) -> Amount {
        self.state.treasury.balance_of(asset)
    }

    pub fn eco_fund_balance(&self, asset: &AssetId) -> Amount {
        self.state.treasury.eco_fund_balance(asset)
    }

    pub fn treasury_account(&self, asset: &AssetId) -> TreasuryAccount {
        self.state.treasury.account(asset)
    }

    // -- host access -------------------------------------------------------

    pub fn governance(&self) -> &Address {
        &self.governance
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the credential ledger for host-side bootstrap
    /// (minting, approvals). Engine state is not affected.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut R {
        &mut self.router
    }

    pub fn last_seen(&self) -> Timestamp {
        self.state.last_seen
    }

    /// Take every event committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<AlmonerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Serialize the internal state to pretty JSON.
    pub fn export_state(&self) -> Result<String, AlmonerError> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }
}
