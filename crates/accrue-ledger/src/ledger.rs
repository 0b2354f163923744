//! The share ledger.
//!
//! [`ShareLedger`] owns the store holding every participant record and the
//! global accumulator. All mutations go through [`ShareLedger::transact`],
//! which takes the ledger-wide lock, hands the operation a [`Session`], and
//! publishes the committed events when the operation ends.
//!
//! The lock is a `ReentrantMutex` around a `RefCell`: other threads block
//! until the operation finishes, while a collaborator that calls back into
//! the ledger from inside an operation finds the cell already borrowed and
//! gets [`LedgerError::Reentrancy`] instead of seeing staged state.

use std::cell::RefCell;

use parking_lot::ReentrantMutex;
use tracing::{debug, error, info, warn};

use accrue_core::constants::MAX_TIME_LOCK_SECS;
use accrue_core::error::LedgerError;
use accrue_core::events::LedgerEvent;
use accrue_core::state::{GlobalState, ParticipantAccount, ParticipantRewardState};
use accrue_core::store::LedgerStore;
use accrue_core::types::{Amount, ParticipantId, Timestamp};

use crate::services::Services;
use crate::settlement;
use crate::txn::Session;

pub struct ShareLedger<S: LedgerStore> {
    state: ReentrantMutex<RefCell<S>>,
    services: Services,
}

impl<S: LedgerStore> ShareLedger<S> {
    pub fn new(store: S, services: Services) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(store)),
            services,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Consume the ledger and return its store.
    pub fn into_store(self) -> S {
        self.state.into_inner().into_inner()
    }

    /// Lock `amount` of `participant`'s balance into the ledger.
    ///
    /// Settles at the old balance, moves `amount` into custody and records it,
    /// all in one step: a failed debit or payout leaves nothing behind. The
    /// time lock restarts at the current time, and the baseline is reset so
    /// the new principal earns nothing retroactively.
    pub fn lock(&self, participant: &ParticipantId, amount: Amount) -> Result<(), LedgerError> {
        let id = *participant;
        self.transact("lock", |session| {
            let now = session.now;
            let mut txn = session.begin()?;
            let payout = settlement::stage(&mut txn, &*session.store, id, now)?.unwrap_or(0);
            let (global, record) = txn.entry(&*session.store, id)?;

            global.total_deposited = global
                .total_deposited
                .checked_add(amount as u128)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            if !record.account.is_excluded {
                let was_empty = record.account.eligible_shares == 0;
                record.account.eligible_shares = record
                    .account
                    .eligible_shares
                    .checked_add(amount)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                global.total_eligible = global
                    .total_eligible
                    .checked_add(amount as u128)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                if was_empty && record.account.eligible_shares > 0 {
                    global.total_participants += 1;
                }
            }
            record.account.actual_balance = record
                .account
                .actual_balance
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            record.account.locked_at = now;
            record.rebase(global.accumulator_per_share)?;
            txn.emit(LedgerEvent::Locked {
                participant: id,
                amount,
                locked_at: now,
            });

            session
                .services
                .transfer
                .debit(&id, amount)
                .map_err(|source| LedgerError::TransferFailed {
                    participant: id,
                    amount,
                    source,
                })?;

            if let Err(e) = settlement::pay(session, id, payout) {
                if let Err(refund) = session.services.transfer.credit(&id, amount) {
                    error!(participant = %id, amount, error = %refund, "custody refund failed");
                }
                return Err(e);
            }

            if let Err(e) = session.commit(txn) {
                error!(participant = %id, amount, payout, error = %e, "lock not recorded after debit; returning custody");
                if let Err(refund) = session.services.transfer.credit(&id, amount) {
                    error!(participant = %id, amount, error = %refund, "custody refund failed");
                }
                return Err(e);
            }
            debug!(participant = %id, amount, payout, "locked");
            Ok(())
        })
    }

    /// Unlock `amount` (zero means everything) and release it from custody.
    ///
    /// Returns the amount released. Allowed once the time lock since the
    /// participant's last lock has elapsed, or at any time while excluded.
    /// Settlement, release and payout form one step.
    pub fn unlock(&self, participant: &ParticipantId, amount: Amount) -> Result<Amount, LedgerError> {
        let id = *participant;
        self.transact("unlock", |session| {
            let now = session.now;
            let current = session.store.participant(&id)?.unwrap_or_default();
            let balance = current.account.actual_balance;
            if balance == 0 {
                return Err(LedgerError::NothingLocked);
            }
            let time_lock = session.store.global()?.time_lock_secs;
            let unlock_at = current.account.locked_at.saturating_add(time_lock);
            if !current.account.is_excluded && now < unlock_at {
                return Err(LedgerError::TimeLockActive { unlock_at, now });
            }
            let amount = if amount == 0 { balance } else { amount };
            if amount > balance {
                return Err(LedgerError::InsufficientBalance {
                    have: balance,
                    need: amount,
                });
            }

            let mut txn = session.begin()?;
            let payout = settlement::stage(&mut txn, &*session.store, id, now)?.unwrap_or(0);
            let (global, record) = txn.entry(&*session.store, id)?;

            global.total_deposited = global
                .total_deposited
                .checked_sub(amount as u128)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            if !record.account.is_excluded {
                record.account.eligible_shares = record
                    .account
                    .eligible_shares
                    .checked_sub(amount)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                global.total_eligible = global
                    .total_eligible
                    .checked_sub(amount as u128)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                if record.account.eligible_shares == 0 {
                    global.total_participants = global.total_participants.saturating_sub(1);
                }
            }
            record.account.actual_balance -= amount;
            record.rebase(global.accumulator_per_share)?;
            txn.emit(LedgerEvent::Unlocked {
                participant: id,
                amount,
            });

            if let Err(source) = session.services.transfer.credit(&id, amount) {
                warn!(participant = %id, amount, error = %source, "custody release failed; unlock rolled back");
                return Err(LedgerError::TransferFailed {
                    participant: id,
                    amount,
                    source,
                });
            }

            if let Err(e) = settlement::pay(session, id, payout) {
                if let Err(retake) = session.services.transfer.debit(&id, amount) {
                    error!(participant = %id, amount, error = %retake, "custody retake failed");
                }
                return Err(e);
            }

            if let Err(e) = session.commit(txn) {
                error!(participant = %id, amount, payout, error = %e, "custody released but unlock not recorded");
                return Err(e);
            }
            debug!(participant = %id, amount, payout, "unlocked");
            Ok(amount)
        })
    }

    /// Mark `participant` excluded from, or readmitted to, reward accrual.
    ///
    /// Exclusion settles in the same step, so everything earned while
    /// eligible is paid. Readmission starts accrual from the current
    /// accumulator; nothing is credited for the excluded interval.
    pub fn set_exclusion(
        &self,
        caller: &ParticipantId,
        participant: &ParticipantId,
        excluded: bool,
    ) -> Result<(), LedgerError> {
        self.authorize(caller)?;
        let id = *participant;
        self.transact("set_exclusion", |session| {
            let current = session.store.participant(&id)?.unwrap_or_default();
            if current.account.is_excluded == excluded {
                return Err(LedgerError::NoOpExclusionChange(excluded));
            }

            let mut txn = session.begin()?;
            let payout = if excluded {
                settlement::stage(&mut txn, &*session.store, id, session.now)?.unwrap_or(0)
            } else {
                0
            };
            let (global, record) = txn.entry(&*session.store, id)?;
            if excluded {
                let shares = record.account.eligible_shares;
                if shares > 0 {
                    global.total_eligible = global
                        .total_eligible
                        .checked_sub(shares as u128)
                        .ok_or(LedgerError::ArithmeticOverflow)?;
                    global.total_participants = global.total_participants.saturating_sub(1);
                }
                record.account.eligible_shares = 0;
            } else {
                let balance = record.account.actual_balance;
                if balance > 0 {
                    global.total_eligible = global
                        .total_eligible
                        .checked_add(balance as u128)
                        .ok_or(LedgerError::ArithmeticOverflow)?;
                    global.total_participants += 1;
                }
                record.account.eligible_shares = balance;
                record.rebase(global.accumulator_per_share)?;
            }
            record.account.is_excluded = excluded;
            txn.emit(LedgerEvent::ExclusionChanged {
                participant: id,
                excluded,
            });

            settlement::pay(session, id, payout)?;
            if let Err(e) = session.commit(txn) {
                error!(participant = %id, payout, error = %e, "reward paid but exclusion not recorded");
                return Err(e);
            }
            info!(participant = %id, excluded, "exclusion changed");
            Ok(())
        })
    }

    /// Replace the time lock. Applies to every participant's next unlock.
    pub fn set_time_lock(&self, caller: &ParticipantId, duration_secs: u64) -> Result<(), LedgerError> {
        self.authorize(caller)?;
        if duration_secs > MAX_TIME_LOCK_SECS {
            return Err(LedgerError::DurationTooLong {
                requested: duration_secs,
                max: MAX_TIME_LOCK_SECS,
            });
        }
        self.transact("set_time_lock", |session| {
            let mut txn = session.begin()?;
            txn.global_mut().time_lock_secs = duration_secs;
            txn.emit(LedgerEvent::TimeLockChanged {
                time_lock_secs: duration_secs,
            });
            session.commit(txn)?;
            info!(time_lock_secs = duration_secs, "time lock changed");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn eligible_shares_of(&self, participant: &ParticipantId) -> Result<Amount, LedgerError> {
        Ok(self.account(participant)?.map_or(0, |a| a.eligible_shares))
    }

    pub fn actual_balance_of(&self, participant: &ParticipantId) -> Result<Amount, LedgerError> {
        Ok(self.account(participant)?.map_or(0, |a| a.actual_balance))
    }

    /// Reward accrued but not yet paid. Zero for excluded or empty accounts.
    pub fn unpaid_of(&self, participant: &ParticipantId) -> Result<Amount, LedgerError> {
        self.read(|store| {
            let acc = store.global()?.accumulator_per_share;
            match store.participant(participant)? {
                Some(record) => record.unpaid(acc),
                None => Ok(0),
            }
        })
    }

    pub fn account(&self, participant: &ParticipantId) -> Result<Option<ParticipantAccount>, LedgerError> {
        self.read(|store| Ok(store.participant(participant)?.map(|r| r.account)))
    }

    pub fn reward_state(
        &self,
        participant: &ParticipantId,
    ) -> Result<Option<ParticipantRewardState>, LedgerError> {
        self.read(|store| Ok(store.participant(participant)?.map(|r| r.rewards)))
    }

    /// Snapshot of the global record.
    pub fn stats(&self) -> Result<GlobalState, LedgerError> {
        self.read(|store| Ok(store.global()?))
    }

    /// Earliest time `participant` may unlock, or `None` if nothing is locked.
    ///
    /// Excluded participants may unlock at any time; their lock time is returned.
    pub fn unlock_available_at(&self, participant: &ParticipantId) -> Result<Option<Timestamp>, LedgerError> {
        self.read(|store| {
            let Some(record) = store.participant(participant)? else {
                return Ok(None);
            };
            if record.account.actual_balance == 0 {
                return Ok(None);
            }
            if record.account.is_excluded {
                return Ok(Some(record.account.locked_at));
            }
            let time_lock = store.global()?.time_lock_secs;
            Ok(Some(record.account.locked_at.saturating_add(time_lock)))
        })
    }

    /// Run `f` with shared access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> Result<R, LedgerError> {
        self.read(|store| Ok(f(store)))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn authorize(&self, caller: &ParticipantId) -> Result<(), LedgerError> {
        if self.services.authorizer.is_authorized(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "unauthorized administrative call");
            Err(LedgerError::Unauthorized(*caller))
        }
    }

    fn read<R>(&self, f: impl FnOnce(&S) -> Result<R, LedgerError>) -> Result<R, LedgerError> {
        let guard = self.state.lock();
        let store = guard.try_borrow().map_err(|_| LedgerError::Reentrancy)?;
        f(&store)
    }

    /// Run one serialized ledger operation.
    ///
    /// Events of committed steps are published after the store borrow is
    /// released but before the lock is, so sinks see operations in order
    /// and may read the committed state.
    pub(crate) fn transact<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Session<'_, S>) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let guard = self.state.lock();
        let (result, events) = {
            let mut store = guard.try_borrow_mut().map_err(|_| LedgerError::Reentrancy)?;
            let mut session = Session::new(&mut *store, &self.services, self.services.clock.now());
            let result = f(&mut session);
            (result, session.into_events())
        };
        if let Err(e) = &result {
            debug!(op, error = %e, "ledger operation failed");
        }
        for event in &events {
            self.services.events.publish(event);
        }
        drop(guard);
        result
    }
}
