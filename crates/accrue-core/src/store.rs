//! Ledger storage interface and in-memory implementation.
//!
//! Provides the [`LedgerStore`] trait: point lookups of the global record and
//! of individual participants, plus an atomic batch write. No operation ever
//! needs to enumerate participants. The [`MemoryLedgerStore`] is suitable for
//! testing; the production node uses RocksDB (accrue-node).

use std::collections::HashMap;

use crate::error::StorageError;
use crate::state::{GlobalState, ParticipantRecord};
use crate::types::ParticipantId;

/// A set of record writes applied all-or-nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    /// Replacement global record, if it changed.
    pub global: Option<GlobalState>,
    /// Replacement participant records.
    pub participants: Vec<(ParticipantId, ParticipantRecord)>,
}

impl LedgerBatch {
    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.participants.is_empty()
    }
}

/// Persistent ledger state.
///
/// Not thread-safe; the ledger serializes access behind its own lock.
pub trait LedgerStore: Send {
    /// Current global record.
    fn global(&self) -> Result<GlobalState, StorageError>;

    /// Look up one participant. Returns `None` if never written.
    fn participant(&self, id: &ParticipantId) -> Result<Option<ParticipantRecord>, StorageError>;

    /// Apply every write in `batch` atomically.
    fn apply(&mut self, batch: LedgerBatch) -> Result<(), StorageError>;
}

/// In-memory ledger storage for testing.
///
/// No persistence, unbounded growth.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedgerStore {
    global: GlobalState,
    participants: HashMap<ParticipantId, ParticipantRecord>,
}

impl MemoryLedgerStore {
    /// Empty store with the default time lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with a custom time lock.
    pub fn with_time_lock(time_lock_secs: u64) -> Self {
        Self {
            global: GlobalState::new(time_lock_secs),
            participants: HashMap::new(),
        }
    }

    /// Number of participant records ever written.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Iterate over all records. Test and audit use only.
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &ParticipantRecord)> {
        self.participants.iter()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn global(&self) -> Result<GlobalState, StorageError> {
        Ok(self.global.clone())
    }

    fn participant(&self, id: &ParticipantId) -> Result<Option<ParticipantRecord>, StorageError> {
        Ok(self.participants.get(id).cloned())
    }

    fn apply(&mut self, batch: LedgerBatch) -> Result<(), StorageError> {
        if let Some(global) = batch.global {
            self.global = global;
        }
        self.participants.extend(batch.participants);
        Ok(())
    }
}
