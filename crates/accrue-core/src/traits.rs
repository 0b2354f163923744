//! Trait interfaces for the ledger's external collaborators.
//!
//! - [`BalanceTransfer`]: moves the locked token in and out of custody
//! - [`PaymentSink`]: delivers reward payouts
//! - [`Authorizer`]: gates administrative operations
//! - [`Clock`]: supplies the current time
//! - [`EventSink`]: receives committed ledger events
//!
//! Every call is synchronous. The ledger serializes its own operations, so
//! implementations never see two concurrent calls from the same ledger, but
//! they must not call back into it (the ledger rejects that with
//! `LedgerError::Reentrancy`).

use std::sync::Arc;

use crate::error::TransferError;
use crate::events::LedgerEvent;
use crate::types::{Amount, ParticipantId, Timestamp};

/// Custody movements of the locked token.
pub trait BalanceTransfer: Send + Sync {
    /// Move `amount` from `from` into ledger custody.
    ///
    /// Fails if the owner lacks balance or has not approved the movement.
    fn debit(&self, from: &ParticipantId, amount: Amount) -> Result<(), TransferError>;

    /// Release `amount` from ledger custody to `to`.
    fn credit(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError>;
}

/// Outbound reward delivery.
pub trait PaymentSink: Send + Sync {
    /// Deliver `amount` of the reward asset to `to`. May fail; the ledger
    /// rolls back the settlement that produced the payment when it does.
    fn pay(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError>;
}

/// Permission check for administrative operations.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, caller: &ParticipantId) -> bool;
}

/// Source of the current time, in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Receiver of committed ledger events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &LedgerEvent);
}

impl<T: BalanceTransfer + ?Sized> BalanceTransfer for Arc<T> {
    fn debit(&self, from: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
        (**self).debit(from, amount)
    }

    fn credit(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
        (**self).credit(to, amount)
    }
}

impl<T: PaymentSink + ?Sized> PaymentSink for Arc<T> {
    fn pay(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
        (**self).pay(to, amount)
    }
}

impl<T: Authorizer + ?Sized> Authorizer for Arc<T> {
    fn is_authorized(&self, caller: &ParticipantId) -> bool {
        (**self).is_authorized(caller)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn publish(&self, event: &LedgerEvent) {
        (**self).publish(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    // ------------------------------------------------------------------
    // Mock: BalanceTransfer + PaymentSink
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockBank {
        balances: Mutex<HashMap<ParticipantId, u64>>,
        custody: Mutex<u64>,
    }

    impl BalanceTransfer for MockBank {
        fn debit(&self, from: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
            let mut balances = self.balances.lock();
            let have = balances.get(from).copied().unwrap_or(0);
            if have < amount {
                return Err(TransferError::InsufficientFunds { have, need: amount });
            }
            balances.insert(*from, have - amount);
            *self.custody.lock() += amount;
            Ok(())
        }

        fn credit(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
            let mut custody = self.custody.lock();
            if *custody < amount {
                return Err(TransferError::InsufficientFunds { have: *custody, need: amount });
            }
            *custody -= amount;
            *self.balances.lock().entry(*to).or_default() += amount;
            Ok(())
        }
    }

    impl PaymentSink for MockBank {
        fn pay(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
            *self.balances.lock().entry(*to).or_default() += amount;
            Ok(())
        }
    }

    #[test]
    fn debit_then_credit_through_arc() {
        let bank = Arc::new(MockBank::default());
        let who = ParticipantId::from_label("who");
        bank.balances.lock().insert(who, 10);

        let transfer: Arc<dyn BalanceTransfer> = bank.clone();
        transfer.debit(&who, 4).unwrap();
        assert_eq!(*bank.custody.lock(), 4);
        transfer.credit(&who, 4).unwrap();
        assert_eq!(bank.balances.lock()[&who], 10);
    }

    #[test]
    fn debit_rejects_overdraft() {
        let bank = MockBank::default();
        let who = ParticipantId::from_label("who");
        assert_eq!(
            bank.debit(&who, 1),
            Err(TransferError::InsufficientFunds { have: 0, need: 1 })
        );
    }

    #[test]
    fn pay_credits_receiver() {
        let bank = MockBank::default();
        let who = ParticipantId::from_label("who");
        bank.pay(&who, 3).unwrap();
        assert_eq!(bank.balances.lock()[&who], 3);
    }
}
