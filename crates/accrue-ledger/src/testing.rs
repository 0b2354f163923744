//! In-memory collaborators and a ready-wired ledger for tests.
//!
//! Compiled for this crate's unit tests and, through the `testing` feature,
//! for downstream test suites.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use accrue_core::auth::AdminList;
use accrue_core::clock::ManualClock;
use accrue_core::error::TransferError;
use accrue_core::events::EventLog;
use accrue_core::store::MemoryLedgerStore;
use accrue_core::traits::{BalanceTransfer, PaymentSink};
use accrue_core::types::{Amount, ParticipantId, Timestamp};

use crate::distributor::RewardDistributor;
use crate::ledger::ShareLedger;
use crate::services::Services;

/// Start time of every fixture clock.
pub const T0: Timestamp = 1_700_000_000;

#[derive(Debug, Default)]
struct VaultState {
    wallets: HashMap<ParticipantId, u64>,
    custody: u64,
    paid: HashMap<ParticipantId, u128>,
    fail_debits: bool,
    fail_credits: bool,
    fail_payments: bool,
}

/// Token custody and reward payouts kept in memory.
///
/// Debits move wallet funds into custody, credits move them back, and
/// payments are tallied per receiver. Each direction can be switched to fail.
#[derive(Debug, Default)]
pub struct Vault {
    state: Mutex<VaultState>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `who` wallet funds they can later lock.
    pub fn fund(&self, who: &ParticipantId, amount: u64) {
        *self.state.lock().wallets.entry(*who).or_default() += amount;
    }

    pub fn wallet(&self, who: &ParticipantId) -> u64 {
        self.state.lock().wallets.get(who).copied().unwrap_or(0)
    }

    pub fn custody(&self) -> u64 {
        self.state.lock().custody
    }

    /// Rewards delivered to `who` so far.
    pub fn paid(&self, who: &ParticipantId) -> u128 {
        self.state.lock().paid.get(who).copied().unwrap_or(0)
    }

    pub fn total_paid(&self) -> u128 {
        self.state.lock().paid.values().sum()
    }

    pub fn set_fail_debits(&self, fail: bool) {
        self.state.lock().fail_debits = fail;
    }

    pub fn set_fail_credits(&self, fail: bool) {
        self.state.lock().fail_credits = fail;
    }

    pub fn set_fail_payments(&self, fail: bool) {
        self.state.lock().fail_payments = fail;
    }
}

impl BalanceTransfer for Vault {
    fn debit(&self, from: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.fail_debits {
            return Err(TransferError::Unavailable("debits disabled".into()));
        }
        let have = state.wallets.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(TransferError::InsufficientFunds { have, need: amount });
        }
        state.wallets.insert(*from, have - amount);
        state.custody += amount;
        Ok(())
    }

    fn credit(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.fail_credits {
            return Err(TransferError::Unavailable("credits disabled".into()));
        }
        if state.custody < amount {
            return Err(TransferError::InsufficientFunds {
                have: state.custody,
                need: amount,
            });
        }
        state.custody -= amount;
        *state.wallets.entry(*to).or_default() += amount;
        Ok(())
    }
}

impl PaymentSink for Vault {
    fn pay(&self, to: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.fail_payments {
            return Err(TransferError::Rejected("payments disabled".into()));
        }
        *state.paid.entry(*to).or_default() += amount as u128;
        Ok(())
    }
}

/// A memory-backed ledger wired to a [`Vault`], a [`ManualClock`] at
/// [`T0`], an [`EventLog`], and a single administrator.
pub struct Fixture {
    pub ledger: Arc<ShareLedger<MemoryLedgerStore>>,
    pub distributor: RewardDistributor<MemoryLedgerStore>,
    pub vault: Arc<Vault>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<EventLog>,
    pub admins: Arc<AdminList>,
    pub admin: ParticipantId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(MemoryLedgerStore::new())
    }

    pub fn with_store(store: MemoryLedgerStore) -> Self {
        let vault = Arc::new(Vault::new());
        let clock = Arc::new(ManualClock::new(T0));
        let events = Arc::new(EventLog::new());
        let admin = ParticipantId::from_label("admin");
        let admins = Arc::new(AdminList::new([admin]));

        let services = Services::new(vault.clone(), vault.clone(), admins.clone())
            .with_clock(clock.clone())
            .with_events(events.clone());
        let ledger = Arc::new(ShareLedger::new(store, services));
        let distributor = RewardDistributor::new(ledger.clone());

        Self {
            ledger,
            distributor,
            vault,
            clock,
            events,
            admins,
            admin,
        }
    }

    /// Named participant with `funds` in their wallet.
    pub fn participant(&self, label: &str, funds: u64) -> ParticipantId {
        let id = ParticipantId::from_label(label);
        self.vault.fund(&id, funds);
        id
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
