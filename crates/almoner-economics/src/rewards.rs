// crates/almoner-economics/src/rewards.rs
//
// Streaming reward accumulator.
//
// A funded epoch emits `reward_rate` units per second until `period_finish`.
// Emission is shared pro rata by stake-time through a global
// reward-per-token accumulator:
//
//   reward_per_token = stored + (min(now, finish) - last_update) * rate * P / total_staked
//   earned(p)        = staked(p) * (reward_per_token - paid(p)) / P + pending(p)
//
// where P = REWARD_PRECISION. The accumulator and its intermediates are
// 256-bit. Every stake mutation must checkpoint the global accumulator and
// the acting participant before changing balances; `StakeLedger` does this
// on every entry point. Settlement never fails: an accrual that cannot be
// represented is dropped with a warning so principal can always move.

use serde::{Deserialize, Serialize};

use almoner_core::error::{AlmonerError, Role};
use almoner_core::identity::Address;
use almoner_core::math::{mul_div_wide, narrow, U256};
use almoner_core::{Amount, Timestamp};

use crate::token::Units;

/// Fixed-point scale of the reward-per-token accumulator.
pub const REWARD_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Default length of a reward epoch: 7 days.
pub const DEFAULT_REWARD_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Global state of the current reward epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEpoch {
    /// Units emitted per second while the epoch runs.
    pub reward_rate: Amount,
    /// Instant at which emission stops.
    pub period_finish: Timestamp,
    /// Instant the accumulator was last brought forward.
    pub last_update_time: Timestamp,
    /// Accumulated reward per staked unit, scaled by `REWARD_PRECISION`.
    pub reward_per_token_stored: U256,
}

/// A participant's checkpoint into the accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccount {
    /// Accumulator value at the participant's last settlement.
    pub reward_per_token_paid: U256,
    /// Reward settled but not yet paid out.
    pub pending_reward: Amount,
}

/// The reward distributor: one running epoch, one funding source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardDistributor {
    epoch: RewardEpoch,
    duration: u64,
    funder: Address,
}

impl RewardDistributor {
    /// Create a distributor funded exclusively by `funder`.
    pub fn new(funder: Address, duration: u64) -> Self {
        Self {
            epoch: RewardEpoch::default(),
            duration,
            funder,
        }
    }

    pub fn epoch(&self) -> &RewardEpoch {
        &self.epoch
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn funder(&self) -> &Address {
        &self.funder
    }

    /// The latest instant that still accrues reward.
    pub fn last_time_reward_applicable(&self, now: Timestamp) -> Timestamp {
        now.min(self.epoch.period_finish)
    }

    /// Current accumulator value. Does not advance while nothing is staked.
    pub fn reward_per_token(&self, now: Timestamp, total_staked: Amount) -> Result<U256, AlmonerError> {
        if total_staked == 0 {
            return Ok(self.epoch.reward_per_token_stored);
        }
        let elapsed = self
            .last_time_reward_applicable(now)
            .saturating_sub(self.epoch.last_update_time);
        // 64-bit elapsed times 128-bit rate always fits
        let emitted = U256::from(elapsed) * U256::from(self.epoch.reward_rate);
        let increment = mul_div_wide(
            emitted,
            U256::from(REWARD_PRECISION),
            U256::from(total_staked),
            "reward per token",
        )?;
        self.epoch
            .reward_per_token_stored
            .checked_add(increment)
            .ok_or(AlmonerError::Overflow("reward per token"))
    }

    /// Reward owed to an account holding `staked` units.
    pub fn earned(
        &self,
        account: &RewardAccount,
        staked: Amount,
        now: Timestamp,
        total_staked: Amount,
    ) -> Result<Amount, AlmonerError> {
        let per_token = self.reward_per_token(now, total_staked)?;
        let unpaid = per_token.saturating_sub(account.reward_per_token_paid);
        let fresh = mul_div_wide(U256::from(staked), unpaid, U256::from(REWARD_PRECISION), "earned")?;
        narrow(fresh, "earned")?
            .checked_add(account.pending_reward)
            .ok_or(AlmonerError::Overflow("earned"))
    }

    /// Bring the global accumulator forward to `now`.
    ///
    /// If the accumulator cannot advance, emission for the running epoch is
    /// stopped at `now` and the stored value is kept.
    pub fn checkpoint(&mut self, now: Timestamp, total_staked: Amount) -> U256 {
        match self.reward_per_token(now, total_staked) {
            Ok(per_token) => self.epoch.reward_per_token_stored = per_token,
            Err(err) => {
                tracing::warn!(error = %err, "Reward accumulator saturated, closing epoch");
                self.epoch.reward_rate = 0;
                self.epoch.period_finish = self.epoch.period_finish.min(now);
            }
        }
        self.epoch.last_update_time = self.last_time_reward_applicable(now);
        self.epoch.reward_per_token_stored
    }

    /// Checkpoint the accumulator, then fold the account's accrual into its
    /// pending reward. Must run before the account's stake changes.
    ///
    /// An accrual that does not fit in `Amount` is forfeited; the pending
    /// reward keeps its previous value.
    pub fn settle(&mut self, account: &mut RewardAccount, staked: Amount, now: Timestamp, total_staked: Amount) {
        let per_token = self.checkpoint(now, total_staked);
        match self.earned(account, staked, now, total_staked) {
            Ok(earned) => account.pending_reward = earned,
            Err(err) => {
                tracing::warn!(error = %err, staked = %Units(staked), "Unrepresentable accrual forfeited");
            }
        }
        account.reward_per_token_paid = per_token;
    }

    /// Fund a new epoch of `duration` seconds starting at `now`.
    ///
    /// If an epoch is still running, its undistributed remainder is blended
    /// into the new rate.
    ///
    /// # Errors
    /// Returns `AlmonerError::Unauthorized` unless `caller` is the funder.
    pub fn notify_reward_amount(
        &mut self,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
        total_staked: Amount,
    ) -> Result<(), AlmonerError> {
        if *caller != self.funder {
            return Err(AlmonerError::Unauthorized {
                role: Role::RewardSource,
            });
        }
        if self.duration == 0 {
            return Err(AlmonerError::Config("reward duration must be non-zero".to_string()));
        }
        self.checkpoint(now, total_staked);

        let duration = self.duration as u128;
        let reward_rate = if now >= self.epoch.period_finish {
            amount / duration
        } else {
            let remaining = (self.epoch.period_finish - now) as u128;
            let leftover = remaining
                .checked_mul(self.epoch.reward_rate)
                .ok_or(AlmonerError::Overflow("reward leftover"))?;
            amount
                .checked_add(leftover)
                .ok_or(AlmonerError::Overflow("reward amount"))?
                / duration
        };

        self.epoch.reward_rate = reward_rate;
        self.epoch.last_update_time = now;
        self.epoch.period_finish = now + self.duration;

        tracing::info!(
            amount = %Units(amount),
            reward_rate = %reward_rate,
            period_finish = self.epoch.period_finish,
            "Reward epoch funded"
        );
        Ok(())
    }
}
