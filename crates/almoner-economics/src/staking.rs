// crates/almoner-economics/src/staking.rs
//
// Stake management: stake/withdraw with a lock period, reward settlement on
// every balance change, and forfeiture for slashing.
//
// Staking and voting both reset the participant's lock:
//   lock_expiry = now + lock_period (default 3 days)
// Withdrawal is refused while now < lock_expiry.
//
// The ledger custodies the staked asset in its own account on the
// credential ledger. The reward asset is the staked asset, so rewards are
// paid out of the same custody balance once the treasury has funded them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use almoner_core::error::AlmonerError;
use almoner_core::identity::{Address, AssetId};
use almoner_core::math::U256;
use almoner_core::traits::{CredentialLedger, RewardFunding};
use almoner_core::{Amount, Timestamp};

use crate::rewards::{RewardAccount, RewardDistributor, DEFAULT_REWARD_DURATION_SECS};
use crate::slashing::{compute_penalty, SlashCondition, SlashResult};
use crate::token::Units;

/// Default lock applied by every stake and every vote: 3 days.
pub const DEFAULT_LOCK_PERIOD_SECS: u64 = 3 * 24 * 60 * 60;

/// Time parameters of the stake ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    /// Seconds a stake or vote locks the participant's balance.
    #[serde(default = "default_lock_period")]
    pub lock_period_secs: u64,

    /// Length of a funded reward epoch.
    #[serde(default = "default_reward_duration")]
    pub reward_duration_secs: u64,
}

fn default_lock_period() -> u64 {
    DEFAULT_LOCK_PERIOD_SECS
}

fn default_reward_duration() -> u64 {
    DEFAULT_REWARD_DURATION_SECS
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            lock_period_secs: default_lock_period(),
            reward_duration_secs: default_reward_duration(),
        }
    }
}

/// A staker's position. Created on first stake, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Amount currently staked.
    pub staked_amount: Amount,
    /// Withdrawal is refused before this instant.
    pub lock_expiry: Timestamp,
    /// Checkpoint into the reward accumulator.
    pub rewards: RewardAccount,
}

/// Outcome of a stake, withdraw, or exit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeReceipt {
    /// Amount moved into (stake) or out of (withdraw) custody.
    pub amount: Amount,
    /// Accrued reward paid out as part of the call.
    pub reward_paid: Amount,
}

/// The stake ledger: balances, locks, and the reward distributor they feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeLedger {
    custody: Address,
    asset: AssetId,
    params: StakingParams,
    participants: HashMap<Address, Participant>,
    total_staked: Amount,
    distributor: RewardDistributor,
}

impl StakeLedger {
    /// Create an empty ledger holding `asset` in `custody`, with rewards
    /// funded only by `reward_source`.
    pub fn new(custody: Address, asset: AssetId, reward_source: Address, params: StakingParams) -> Self {
        let distributor = RewardDistributor::new(reward_source, params.reward_duration_secs);
        Self {
            custody,
            asset,
            params,
            participants: HashMap::new(),
            total_staked: 0,
            distributor,
        }
    }

    pub fn custody(&self) -> &Address {
        &self.custody
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    pub fn distributor(&self) -> &RewardDistributor {
        &self.distributor
    }

    pub fn participant(&self, who: &Address) -> Option<&Participant> {
        self.participants.get(who)
    }

    /// Staked balance of `who` (zero if they never staked).
    pub fn balance_of(&self, who: &Address) -> Amount {
        self.participants.get(who).map_or(0, |p| p.staked_amount)
    }

    pub fn lock_expiry(&self, who: &Address) -> Timestamp {
        self.participants.get(who).map_or(0, |p| p.lock_expiry)
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn reward_per_token(&self, now: Timestamp) -> Result<U256, AlmonerError> {
        self.distributor.reward_per_token(now, self.total_staked)
    }

    /// Reward `who` could claim at `now`.
    pub fn earned(&self, who: &Address, now: Timestamp) -> Result<Amount, AlmonerError> {
        match self.participants.get(who) {
            Some(p) => self
                .distributor
                .earned(&p.rewards, p.staked_amount, now, self.total_staked),
            None => Ok(0),
        }
    }

    /// Checkpoint the accumulator and, if `who` has a record, their reward
    /// account.
    fn settle(&mut self, who: &Address, now: Timestamp) -> Option<&mut Participant> {
        let total = self.total_staked;
        let Some(participant) = self.participants.get_mut(who) else {
            self.distributor.checkpoint(now, total);
            return None;
        };
        self.distributor
            .settle(&mut participant.rewards, participant.staked_amount, now, total);
        tracing::debug!(
            participant = %who,
            pending = %participant.rewards.pending_reward,
            "Reward checkpoint settled"
        );
        Some(participant)
    }

    /// Settle and zero `who`'s pending reward, returning the amount to pay.
    fn take_reward(&mut self, who: &Address, now: Timestamp) -> Amount {
        self.settle(who, now)
            .map_or(0, |participant| std::mem::take(&mut participant.rewards.pending_reward))
    }

    fn pay_reward<L: CredentialLedger>(
        &self,
        ledger: &mut L,
        who: &Address,
        reward: Amount,
    ) -> Result<(), AlmonerError> {
        if reward > 0 {
            ledger.transfer(&self.asset, &self.custody, who, reward)?;
            tracing::info!(participant = %who, reward = %Units(reward), "Reward paid");
        }
        Ok(())
    }

    /// Stake `amount` from `caller`, paying out any accrued reward.
    ///
    /// Resets the caller's lock to `now + lock_period`.
    ///
    /// # Errors
    /// Returns `AlmonerError::ZeroAmount` for a zero stake, or a collaborator
    /// error if the ledger refuses to move the caller's funds.
    pub fn stake<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<StakeReceipt, AlmonerError> {
        if amount == 0 {
            return Err(AlmonerError::ZeroAmount);
        }
        let reward = self.take_reward(caller, now);
        let new_total = self
            .total_staked
            .checked_add(amount)
            .ok_or(AlmonerError::Overflow("total staked"))?;
        let lock_expiry = now + self.params.lock_period_secs;

        let participant = self.participants.entry(*caller).or_default();
        participant.staked_amount += amount;
        participant.lock_expiry = lock_expiry;
        self.total_staked = new_total;

        // Pull first: a refused pull leaves the custody untouched.
        ledger.transfer_from(&self.asset, &self.custody, caller, &self.custody, amount)?;
        self.pay_reward(ledger, caller, reward)?;

        tracing::info!(
            participant = %caller,
            amount = %Units(amount),
            total_staked = %Units(self.total_staked),
            lock_expiry,
            "Stake added"
        );
        Ok(StakeReceipt {
            amount,
            reward_paid: reward,
        })
    }

    /// Withdraw `amount` of `caller`'s stake, paying out any accrued reward.
    ///
    /// # Errors
    /// Returns `AlmonerError::TokensLocked` before the lock expires and
    /// `AlmonerError::InsufficientBalance` if `amount` exceeds the stake.
    pub fn withdraw<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<StakeReceipt, AlmonerError> {
        if amount == 0 {
            return Err(AlmonerError::ZeroAmount);
        }
        let lock_expiry = self.lock_expiry(caller);
        if now < lock_expiry {
            return Err(AlmonerError::TokensLocked { until: lock_expiry });
        }
        let available = self.balance_of(caller);
        if amount > available {
            return Err(AlmonerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let reward = self.take_reward(caller, now);
        if let Some(participant) = self.participants.get_mut(caller) {
            participant.staked_amount -= amount;
        }
        self.total_staked -= amount;

        ledger.transfer(&self.asset, &self.custody, caller, amount)?;
        self.pay_reward(ledger, caller, reward)?;

        tracing::info!(
            participant = %caller,
            amount = %Units(amount),
            total_staked = %Units(self.total_staked),
            "Stake withdrawn"
        );
        Ok(StakeReceipt {
            amount,
            reward_paid: reward,
        })
    }

    /// Pay out `caller`'s accrued reward without touching the stake.
    pub fn claim_reward<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        now: Timestamp,
    ) -> Result<Amount, AlmonerError> {
        let reward = self.take_reward(caller, now);
        self.pay_reward(ledger, caller, reward)?;
        Ok(reward)
    }

    /// Withdraw the entire stake and claim the reward.
    ///
    /// A caller with nothing staked only claims.
    pub fn exit<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        caller: &Address,
        now: Timestamp,
    ) -> Result<StakeReceipt, AlmonerError> {
        let staked = self.balance_of(caller);
        if staked == 0 {
            let reward = self.claim_reward(ledger, caller, now)?;
            return Ok(StakeReceipt {
                amount: 0,
                reward_paid: reward,
            });
        }
        self.withdraw(ledger, caller, staked, now)
    }

    /// Re-lock `who`'s stake until `now + lock_period`. Applied on every vote.
    pub fn extend_lock(&mut self, who: &Address, now: Timestamp) {
        let lock_expiry = now + self.params.lock_period_secs;
        self.participants.entry(*who).or_default().lock_expiry = lock_expiry;
    }

    /// Forfeit `offender`'s stake under `condition`.
    ///
    /// The offender's reward is settled first and stays claimable. The
    /// forfeited units remain in custody; the caller is responsible for
    /// moving them to their destination.
    pub fn slash(
        &mut self,
        offender: &Address,
        condition: SlashCondition,
        now: Timestamp,
    ) -> Result<SlashResult, AlmonerError> {
        let penalty = match self.settle(offender, now) {
            Some(participant) => {
                let penalty = compute_penalty(&condition, participant.staked_amount);
                participant.staked_amount -= penalty;
                penalty
            }
            None => 0,
        };
        self.total_staked -= penalty;

        tracing::warn!(
            offender = %offender,
            amount = %Units(penalty),
            condition = ?condition,
            "Stake slashed"
        );
        Ok(SlashResult {
            condition,
            offender: *offender,
            amount_slashed: penalty,
        })
    }
}

impl RewardFunding for StakeLedger {
    fn notify_reward_amount(
        &mut self,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), AlmonerError> {
        self.distributor
            .notify_reward_amount(caller, amount, now, self.total_staked)
    }
}
