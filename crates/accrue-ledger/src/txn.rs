//! Staged ledger transactions.
//!
//! A [`LedgerTxn`] is a private working copy of the global record plus every
//! participant record it has touched. Nothing reaches the store until
//! [`Session::commit`] turns it into one [`LedgerBatch`]; dropping the txn
//! discards every staged change.
//!
//! A [`Session`] is the context of one public ledger operation. It owns
//! mutable access to the store for the duration of the operation and
//! collects the events of every committed step so the ledger can publish
//! them once the operation ends.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use accrue_core::error::LedgerError;
use accrue_core::events::LedgerEvent;
use accrue_core::state::{GlobalState, ParticipantRecord};
use accrue_core::store::{LedgerBatch, LedgerStore};
use accrue_core::types::{ParticipantId, Timestamp};

use crate::services::Services;

pub(crate) struct LedgerTxn {
    global: GlobalState,
    global_dirty: bool,
    touched: BTreeMap<ParticipantId, ParticipantRecord>,
    events: Vec<LedgerEvent>,
}

impl LedgerTxn {
    pub(crate) fn begin<S: LedgerStore>(store: &S) -> Result<Self, LedgerError> {
        Ok(Self {
            global: store.global()?,
            global_dirty: false,
            touched: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    pub(crate) fn global(&self) -> &GlobalState {
        &self.global
    }

    pub(crate) fn global_mut(&mut self) -> &mut GlobalState {
        self.global_dirty = true;
        &mut self.global
    }

    /// Staged or stored copy of a record, without marking it for write.
    ///
    /// Unknown participants read as a zeroed record.
    pub(crate) fn peek<S: LedgerStore>(
        &self,
        store: &S,
        id: &ParticipantId,
    ) -> Result<ParticipantRecord, LedgerError> {
        match self.touched.get(id) {
            Some(record) => Ok(record.clone()),
            None => Ok(store.participant(id)?.unwrap_or_default()),
        }
    }

    /// Global record and one participant record, both marked for write.
    pub(crate) fn entry<S: LedgerStore>(
        &mut self,
        store: &S,
        id: ParticipantId,
    ) -> Result<(&mut GlobalState, &mut ParticipantRecord), LedgerError> {
        let record = match self.touched.entry(id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => v.insert(store.participant(&id)?.unwrap_or_default()),
        };
        self.global_dirty = true;
        Ok((&mut self.global, record))
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    fn into_parts(self) -> (LedgerBatch, Vec<LedgerEvent>) {
        let batch = LedgerBatch {
            global: self.global_dirty.then_some(self.global),
            participants: self.touched.into_iter().collect(),
        };
        (batch, self.events)
    }
}

pub(crate) struct Session<'a, S: LedgerStore> {
    pub(crate) store: &'a mut S,
    pub(crate) services: &'a Services,
    /// Clock reading taken once when the operation started.
    pub(crate) now: Timestamp,
    committed: Vec<LedgerEvent>,
}

impl<'a, S: LedgerStore> Session<'a, S> {
    pub(crate) fn new(store: &'a mut S, services: &'a Services, now: Timestamp) -> Self {
        Self {
            store,
            services,
            now,
            committed: Vec::new(),
        }
    }

    pub(crate) fn begin(&self) -> Result<LedgerTxn, LedgerError> {
        LedgerTxn::begin(&*self.store)
    }

    /// Write the staged changes in one batch and keep their events.
    pub(crate) fn commit(&mut self, txn: LedgerTxn) -> Result<(), LedgerError> {
        let (batch, events) = txn.into_parts();
        if !batch.is_empty() {
            self.store.apply(batch)?;
        }
        self.committed.extend(events);
        Ok(())
    }

    /// Record an event that has no state change behind it.
    pub(crate) fn announce(&mut self, event: LedgerEvent) {
        self.committed.push(event);
    }

    pub(crate) fn into_events(self) -> Vec<LedgerEvent> {
        self.committed
    }
}
