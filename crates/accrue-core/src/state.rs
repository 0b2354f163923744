//! Persistent ledger records.
//!
//! [`GlobalState`] is one record per ledger. Every participant has exactly
//! one [`ParticipantRecord`], pairing the share account with its reward
//! bookkeeping. Records are created lazily and never deleted; a participant
//! who unlocks everything keeps a zeroed record.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TIME_LOCK_SECS;
use crate::error::LedgerError;
use crate::math;
use crate::types::{Amount, Timestamp};

/// Ledger-wide totals and the reward accumulator.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct GlobalState {
    /// Minimum seconds between a participant's last lock and an unlock.
    pub time_lock_secs: u64,
    /// Sum of every participant's actual locked balance.
    pub total_deposited: u128,
    /// Sum of locked balances of non-excluded participants. The accrual divisor.
    pub total_eligible: u128,
    /// Participants with a nonzero eligible balance.
    pub total_participants: u64,
    /// Lifetime rewards handed to the ledger.
    pub total_rewards_deposited: u128,
    /// Lifetime rewards paid out.
    pub total_rewards_distributed: u128,
    /// Cumulative reward per eligible share, scaled by [`SCALE`](crate::constants::SCALE).
    pub accumulator_per_share: u128,
}

impl GlobalState {
    /// Fresh ledger state with the given time lock.
    pub fn new(time_lock_secs: u64) -> Self {
        Self {
            time_lock_secs,
            total_deposited: 0,
            total_eligible: 0,
            total_participants: 0,
            total_rewards_deposited: 0,
            total_rewards_distributed: 0,
            accumulator_per_share: 0,
        }
    }

    /// Rewards deposited but not yet paid: owed balances plus rounding dust.
    pub fn undistributed(&self) -> u128 {
        self.total_rewards_deposited
            .saturating_sub(self.total_rewards_distributed)
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_LOCK_SECS)
    }
}

/// Share-side view of a participant.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct ParticipantAccount {
    /// Balance counted toward `total_eligible`; zero while excluded.
    pub eligible_shares: Amount,
    /// True locked balance.
    pub actual_balance: Amount,
    /// Time of the most recent lock.
    pub locked_at: Timestamp,
    /// Whether the participant is barred from accruing rewards.
    pub is_excluded: bool,
}

/// Reward-side view of a participant.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct ParticipantRewardState {
    /// Cumulative entitlement already accounted for (the settlement watermark).
    pub accrual_baseline: u128,
    /// Lifetime rewards paid to this participant.
    pub total_realised: u128,
    /// Time of the last settlement.
    pub last_claim_at: Timestamp,
    /// Reward settled but not yet paid because it exceeded one payout.
    pub deferred: u128,
}

/// A participant's account and reward state, stored together.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct ParticipantRecord {
    pub account: ParticipantAccount,
    pub rewards: ParticipantRewardState,
}

impl ParticipantRecord {
    /// Everything owed at accumulator value `acc`: accrual on eligible
    /// shares plus any deferred remainder.
    ///
    /// Accrual is zero whenever the participant holds no eligible shares,
    /// even if the baseline is stale.
    pub fn owed(&self, acc: u128) -> Result<u128, LedgerError> {
        let accrued = if self.account.eligible_shares == 0 {
            0
        } else {
            math::unpaid(self.account.actual_balance, acc, self.rewards.accrual_baseline)?
        };
        accrued
            .checked_add(self.rewards.deferred)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// Reward the next settlement would pay at `acc`, capped at one payout.
    pub fn unpaid(&self, acc: u128) -> Result<Amount, LedgerError> {
        Ok(u64::try_from(self.owed(acc)?).unwrap_or(Amount::MAX))
    }

    /// Whether a settlement would change anything.
    pub fn needs_settlement(&self) -> bool {
        self.account.eligible_shares > 0 || self.rewards.deferred > 0
    }

    /// Realise what is owed at `acc` and rebase. Returns the payout.
    ///
    /// At most [`Amount::MAX`] is paid; the rest stays in `deferred` for the
    /// next settlement.
    pub fn realise(&mut self, acc: u128) -> Result<Amount, LedgerError> {
        let owed = self.owed(acc)?;
        let amount = u64::try_from(owed).unwrap_or(Amount::MAX);
        self.rewards.deferred = owed - amount as u128;
        self.rewards.total_realised = self
            .rewards
            .total_realised
            .checked_add(amount as u128)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.rebase(acc)?;
        Ok(amount)
    }

    /// Move the baseline to the current entitlement of the actual balance.
    pub fn rebase(&mut self, acc: u128) -> Result<(), LedgerError> {
        self.rewards.accrual_baseline = math::baseline(self.account.actual_balance, acc)?;
        Ok(())
    }
}
