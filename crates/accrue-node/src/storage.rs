//! RocksDB-backed persistent ledger storage.
//!
//! Implements [`LedgerStore`] with two column families: `global` holds the
//! single [`GlobalState`] record and `participants` holds one
//! [`ParticipantRecord`] per participant, keyed by the 32-byte id. Records
//! are bincode-encoded and every batch is written through one [`WriteBatch`].

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use tracing::info;

use accrue_core::error::StorageError;
use accrue_core::state::{GlobalState, ParticipantRecord};
use accrue_core::store::{LedgerBatch, LedgerStore};
use accrue_core::types::ParticipantId;

// --- Column family names ---

const CF_GLOBAL: &str = "global";
const CF_PARTICIPANTS: &str = "participants";

const ALL_CFS: &[&str] = &[CF_GLOBAL, CF_PARTICIPANTS];

const GLOBAL_KEY: &[u8] = b"state";

pub struct RocksLedgerStore {
    db: DB,
}

impl RocksLedgerStore {
    /// Open or create a ledger database at `path`.
    ///
    /// A fresh database is seeded with an empty [`GlobalState`] carrying
    /// `initial_time_lock_secs`. An existing database keeps its persisted
    /// time lock.
    pub fn open(path: impl AsRef<Path>, initial_time_lock_secs: u64) -> Result<Self, StorageError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut store = Self { db };

        if store.load_global()?.is_none() {
            info!(time_lock_secs = initial_time_lock_secs, "initializing empty ledger");
            store.apply(LedgerBatch {
                global: Some(GlobalState::new(initial_time_lock_secs)),
                participants: Vec::new(),
            })?;
        }
        Ok(store)
    }

    /// Flush all in-memory buffers to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    /// Number of participant records on disk. Walks the whole column family.
    pub fn participant_count(&self) -> Result<usize, StorageError> {
        let cf = self.cf_handle(CF_PARTICIPANTS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            item.map_err(|e| StorageError::Backend(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    // --- Internal helpers ---

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Backend(format!("missing column family: {name}")))
    }

    fn load_global(&self) -> Result<Option<GlobalState>, StorageError> {
        let cf = self.cf_handle(CF_GLOBAL)?;
        match self
            .db
            .get_cf(cf, GLOBAL_KEY)
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

impl LedgerStore for RocksLedgerStore {
    fn global(&self) -> Result<GlobalState, StorageError> {
        self.load_global()?
            .ok_or_else(|| StorageError::Corrupt("global record missing".into()))
    }

    fn participant(&self, id: &ParticipantId) -> Result<Option<ParticipantRecord>, StorageError> {
        let cf = self.cf_handle(CF_PARTICIPANTS)?;
        match self
            .db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn apply(&mut self, batch: LedgerBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut wb = WriteBatch::default();
        if let Some(global) = &batch.global {
            let cf = self.cf_handle(CF_GLOBAL)?;
            wb.put_cf(cf, GLOBAL_KEY, encode(global)?);
        }
        if !batch.participants.is_empty() {
            let cf = self.cf_handle(CF_PARTICIPANTS)?;
            for (id, record) in &batch.participants {
                wb.put_cf(cf, id.as_bytes(), encode(record)?);
            }
        }
        self.db
            .write(wb)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

fn encode<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| StorageError::Codec(e.to_string()))
}

fn decode<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T, StorageError> {
    let (value, read) = bincode::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| StorageError::Codec(e.to_string()))?;
    if read != bytes.len() {
        return Err(StorageError::Corrupt(format!(
            "trailing bytes: decoded {read} of {}",
            bytes.len()
        )));
    }
    Ok(value)
}
