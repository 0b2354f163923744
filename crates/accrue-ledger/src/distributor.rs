//! Reward deposits and claims.
//!
//! Depositing is O(1): the reward is folded into the per-share accumulator
//! and nobody's record is touched. Participants collect their share through
//! settlement, either explicitly via [`RewardDistributor::claim`] or
//! implicitly whenever their balance changes.

use std::sync::Arc;

use tracing::info;

use accrue_core::error::LedgerError;
use accrue_core::events::LedgerEvent;
use accrue_core::math;
use accrue_core::store::LedgerStore;
use accrue_core::types::{Amount, ParticipantId};

use crate::ledger::ShareLedger;
use crate::settlement;

/// Deposit and claim front-end over a shared [`ShareLedger`].
///
/// Holds no state of its own.
pub struct RewardDistributor<S: LedgerStore> {
    ledger: Arc<ShareLedger<S>>,
}

impl<S: LedgerStore> Clone for RewardDistributor<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<S: LedgerStore> RewardDistributor<S> {
    pub fn new(ledger: Arc<ShareLedger<S>>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<ShareLedger<S>> {
        &self.ledger
    }

    /// Fold `amount` of new reward into the accumulator.
    ///
    /// The payment source has already handed the funds over. Returns the
    /// accumulator increment (scaled); `amount * SCALE` not divisible by the
    /// eligible total leaves the remainder as undistributed dust.
    pub fn deposit_rewards(&self, depositor: &ParticipantId, amount: Amount) -> Result<u128, LedgerError> {
        let depositor = *depositor;
        self.ledger.transact("deposit_rewards", |session| {
            if amount == 0 {
                return Err(LedgerError::ZeroDeposit);
            }
            let mut txn = session.begin()?;
            let global = txn.global_mut();
            if global.total_eligible == 0 {
                return Err(LedgerError::NoEligibleShares);
            }

            let increment = math::accumulator_increment(amount, global.total_eligible)?;
            global.total_rewards_deposited = global
                .total_rewards_deposited
                .checked_add(amount as u128)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            global.accumulator_per_share = global
                .accumulator_per_share
                .checked_add(increment)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            let accumulator_per_share = global.accumulator_per_share;
            txn.emit(LedgerEvent::RewardsDeposited {
                depositor,
                amount,
                accumulator_per_share,
            });

            session.commit(txn)?;
            info!(%depositor, amount, increment, "rewards deposited");
            Ok(increment)
        })
    }

    /// Settle `participant` and pay whatever is owed. Returns the amount paid.
    ///
    /// A `RewardClaimed` event is published even when nothing was owed.
    pub fn claim(&self, participant: &ParticipantId) -> Result<Amount, LedgerError> {
        let id = *participant;
        self.ledger.transact("claim", |session| {
            let amount = settlement::settle(session, id)?;
            session.announce(LedgerEvent::RewardClaimed { participant: id });
            Ok(amount)
        })
    }

    /// Reward currently claimable by `participant`.
    pub fn pending(&self, participant: &ParticipantId) -> Result<Amount, LedgerError> {
        self.ledger.unpaid_of(participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_core::constants::SCALE;

    use crate::testing::{Fixture, T0};

    #[test]
    fn zero_deposit_rejected() {
        let f = Fixture::new();
        assert_eq!(
            f.distributor.deposit_rewards(&f.admin, 0),
            Err(LedgerError::ZeroDeposit)
        );
    }

    #[test]
    fn deposit_without_eligible_shares_rejected() {
        let f = Fixture::new();
        assert_eq!(
            f.distributor.deposit_rewards(&f.admin, 10),
            Err(LedgerError::NoEligibleShares)
        );

        // Excluded balances do not count.
        let bob = f.participant("bob", 100);
        f.ledger.set_exclusion(&f.admin, &bob, true).unwrap();
        f.ledger.lock(&bob, 100).unwrap();
        assert_eq!(
            f.distributor.deposit_rewards(&f.admin, 10),
            Err(LedgerError::NoEligibleShares)
        );
        assert_eq!(f.ledger.stats().unwrap().total_rewards_deposited, 0);
    }

    #[test]
    fn deposit_advances_accumulator() {
        let f = Fixture::new();
        let alice = f.participant("alice", 1_000);
        f.ledger.lock(&alice, 100).unwrap();

        let inc = f.distributor.deposit_rewards(&f.admin, 1_000).unwrap();
        assert_eq!(inc, 10 * SCALE);
        let stats = f.ledger.stats().unwrap();
        assert_eq!(stats.accumulator_per_share, 10 * SCALE);
        assert_eq!(stats.total_rewards_deposited, 1_000);
        assert_eq!(f.distributor.pending(&alice).unwrap(), 1_000);
    }

    #[test]
    fn claim_pays_once() {
        let f = Fixture::new();
        let alice = f.participant("alice", 1_000);
        f.ledger.lock(&alice, 100).unwrap();
        f.distributor.deposit_rewards(&f.admin, 1_000).unwrap();

        assert_eq!(f.distributor.claim(&alice).unwrap(), 1_000);
        assert_eq!(f.distributor.claim(&alice).unwrap(), 0);
        assert_eq!(f.vault.paid(&alice), 1_000);

        let rewards = f.ledger.reward_state(&alice).unwrap().unwrap();
        assert_eq!(rewards.total_realised, 1_000);
        assert_eq!(rewards.last_claim_at, T0);
        assert_eq!(f.ledger.stats().unwrap().total_rewards_distributed, 1_000);
    }

    #[test]
    fn claim_always_emits_claimed_event() {
        let f = Fixture::new();
        let nobody = ParticipantId::from_label("nobody");
        assert_eq!(f.distributor.claim(&nobody).unwrap(), 0);
        assert_eq!(
            f.events.snapshot(),
            vec![LedgerEvent::RewardClaimed { participant: nobody }]
        );
        // A claim by an unknown participant creates no record.
        assert_eq!(f.ledger.account(&nobody).unwrap(), None);
    }

    #[test]
    fn claim_emits_distribution_before_claim() {
        let f = Fixture::new();
        let alice = f.participant("alice", 1_000);
        f.ledger.lock(&alice, 10).unwrap();
        f.distributor.deposit_rewards(&f.admin, 30).unwrap();
        f.events.drain();

        f.distributor.claim(&alice).unwrap();
        assert_eq!(
            f.events.snapshot(),
            vec![
                LedgerEvent::RewardDistributed { participant: alice, amount: 30 },
                LedgerEvent::RewardClaimed { participant: alice },
            ]
        );
    }

    #[test]
    fn failed_payment_keeps_reward_owed() {
        let f = Fixture::new();
        let alice = f.participant("alice", 1_000);
        f.ledger.lock(&alice, 100).unwrap();
        f.distributor.deposit_rewards(&f.admin, 700).unwrap();
        f.events.drain();
        f.vault.set_fail_payments(true);

        let err = f.distributor.claim(&alice).unwrap_err();
        assert!(matches!(err, LedgerError::TransferFailed { amount: 700, .. }));
        assert_eq!(f.distributor.pending(&alice).unwrap(), 700);
        assert_eq!(f.ledger.reward_state(&alice).unwrap().unwrap().total_realised, 0);
        assert_eq!(f.ledger.stats().unwrap().total_rewards_distributed, 0);
        assert!(f.events.is_empty());

        f.vault.set_fail_payments(false);
        assert_eq!(f.distributor.claim(&alice).unwrap(), 700);
        assert_eq!(f.vault.paid(&alice), 700);
    }

    #[test]
    fn split_follows_eligible_shares() {
        let f = Fixture::new();
        let alice = f.participant("alice", 1_000);
        let bob = f.participant("bob", 1_000);
        f.ledger.lock(&alice, 300).unwrap();
        f.ledger.lock(&bob, 100).unwrap();
        f.distributor.deposit_rewards(&f.admin, 400).unwrap();
        assert_eq!(f.distributor.pending(&alice).unwrap(), 300);
        assert_eq!(f.distributor.pending(&bob).unwrap(), 100);
    }

    #[test]
    fn distributor_clones_share_one_ledger() {
        let f = Fixture::new();
        let alice = f.participant("alice", 1_000);
        f.ledger.lock(&alice, 10).unwrap();
        let other = f.distributor.clone();
        other.deposit_rewards(&f.admin, 10).unwrap();
        assert!(Arc::ptr_eq(other.ledger(), f.distributor.ledger()));
        assert_eq!(f.distributor.pending(&alice).unwrap(), 10);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn one_deposit_splits_without_overpaying(
                balances in proptest::collection::vec(1u64..1_000_000, 1..8),
                amount in 1u64..1_000_000_000,
            ) {
                let f = Fixture::new();
                let ids: Vec<_> = balances
                    .iter()
                    .enumerate()
                    .map(|(i, b)| {
                        let id = f.participant(&format!("p{i}"), *b);
                        f.ledger.lock(&id, *b).unwrap();
                        id
                    })
                    .collect();
                f.distributor.deposit_rewards(&f.admin, amount).unwrap();

                let owed: u128 = ids
                    .iter()
                    .map(|id| f.distributor.pending(id).unwrap() as u128)
                    .sum();
                prop_assert!(owed <= amount as u128);
                // Each holder loses at most one unit to flooring.
                prop_assert!(owed + ids.len() as u128 >= amount as u128);
            }
        }
    }
}
