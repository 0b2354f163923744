//! Settlement: pay a participant what they have accrued and move their
//! baseline to the current accumulator.
//!
//! Settlement must run before any change to a participant's share count, so
//! rewards earned under the old balance are paid at the old balance.

use accrue_core::error::LedgerError;
use accrue_core::events::LedgerEvent;
use accrue_core::store::LedgerStore;
use accrue_core::types::{Amount, ParticipantId, Timestamp};
use tracing::{debug, error, warn};

use crate::txn::{LedgerTxn, Session};

/// Stage the settlement bookkeeping for `id` in `txn`.
///
/// Returns `None` when there is nothing to settle: no eligible shares and no
/// deferred remainder. Otherwise returns the payout, after advancing
/// `total_realised`, the baseline, and `last_claim_at`. The baseline and
/// timestamp move even when the payout is zero. A payout is capped at
/// [`Amount::MAX`]; the rest stays deferred on the record.
pub(crate) fn stage<S: LedgerStore>(
    txn: &mut LedgerTxn,
    store: &S,
    id: ParticipantId,
    now: Timestamp,
) -> Result<Option<Amount>, LedgerError> {
    if !txn.peek(store, &id)?.needs_settlement() {
        return Ok(None);
    }

    let (global, record) = txn.entry(store, id)?;
    let amount = record.realise(global.accumulator_per_share)?;
    record.rewards.last_claim_at = now;

    if amount > 0 {
        global.total_rewards_distributed = global
            .total_rewards_distributed
            .checked_add(amount as u128)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        txn.emit(LedgerEvent::RewardDistributed {
            participant: id,
            amount,
        });
    }

    Ok(Some(amount))
}

/// Hand a staged payout to the payment sink. Zero payouts are skipped.
///
/// The caller still holds the staged txn and drops it on error.
pub(crate) fn pay<S: LedgerStore>(
    session: &Session<'_, S>,
    id: ParticipantId,
    amount: Amount,
) -> Result<(), LedgerError> {
    if amount == 0 {
        return Ok(());
    }
    session.services.payments.pay(&id, amount).map_err(|source| {
        warn!(participant = %id, amount, error = %source, "reward payment failed; settlement rolled back");
        LedgerError::TransferFailed {
            participant: id,
            amount,
            source,
        }
    })
}

/// Settle `id` as one step: stage, pay, commit.
///
/// A failed payment drops the staged bookkeeping, so the reward stays owed
/// and a later settlement pays it.
pub(crate) fn settle<S: LedgerStore>(
    session: &mut Session<'_, S>,
    id: ParticipantId,
) -> Result<Amount, LedgerError> {
    let mut txn = session.begin()?;
    let Some(amount) = stage(&mut txn, &*session.store, id, session.now)? else {
        return Ok(0);
    };
    pay(session, id, amount)?;

    if let Err(e) = session.commit(txn) {
        error!(participant = %id, amount, error = %e, "reward paid but settlement not recorded");
        return Err(e);
    }
    debug!(participant = %id, amount, "settled");
    Ok(amount)
}
