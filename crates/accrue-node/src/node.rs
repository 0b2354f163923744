//! Persistent ledger composition.
//!
//! [`LedgerNode`] opens the RocksDB store named by a [`LedgerConfig`], wires
//! the event sinks it asks for, and exposes the resulting ledger and
//! distributor. Collaborators that move funds or decide permissions are
//! supplied by the embedding application.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use accrue_core::error::{AccrueError, StorageError};
use accrue_core::events::LedgerEvent;
use accrue_core::traits::{Authorizer, BalanceTransfer, Clock, PaymentSink};
use accrue_ledger::{RewardDistributor, Services, ShareLedger};

use crate::config::LedgerConfig;
use crate::events::{AuditLogSink, BroadcastSink, FanoutSink};
use crate::storage::RocksLedgerStore;

pub struct LedgerNode {
    config: LedgerConfig,
    ledger: Arc<ShareLedger<RocksLedgerStore>>,
    distributor: RewardDistributor<RocksLedgerStore>,
    broadcast: Arc<BroadcastSink>,
}

impl LedgerNode {
    /// Open the ledger described by `config` with the wall clock.
    pub fn open(
        config: LedgerConfig,
        transfer: Arc<dyn BalanceTransfer>,
        payments: Arc<dyn PaymentSink>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<Self, AccrueError> {
        let services = Services::new(transfer, payments, authorizer);
        Self::open_with(config, services)
    }

    /// Open with an explicit clock.
    pub fn open_with_clock(
        config: LedgerConfig,
        transfer: Arc<dyn BalanceTransfer>,
        payments: Arc<dyn PaymentSink>,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AccrueError> {
        let services = Services::new(transfer, payments, authorizer).with_clock(clock);
        Self::open_with(config, services)
    }

    fn open_with(config: LedgerConfig, services: Services) -> Result<Self, AccrueError> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            StorageError::Backend(format!("create {}: {e}", config.data_dir.display()))
        })?;

        let store = RocksLedgerStore::open(config.db_path(), config.time_lock_secs)?;

        let broadcast = Arc::new(BroadcastSink::new(config.event_channel_capacity));
        let mut sinks = FanoutSink::new().with(broadcast.clone());
        if let Some(path) = &config.audit_log {
            sinks = sinks.with(Arc::new(AuditLogSink::open(path)?));
            info!(path = %path.display(), "audit log enabled");
        }

        let ledger = Arc::new(ShareLedger::new(store, services.with_events(Arc::new(sinks))));
        let distributor = RewardDistributor::new(ledger.clone());

        let stats = ledger.stats()?;
        info!(
            db_path = %config.db_path().display(),
            time_lock_secs = stats.time_lock_secs,
            total_deposited = %stats.total_deposited,
            "ledger opened"
        );

        Ok(Self {
            config,
            ledger,
            distributor,
            broadcast,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<ShareLedger<RocksLedgerStore>> {
        &self.ledger
    }

    pub fn distributor(&self) -> &RewardDistributor<RocksLedgerStore> {
        &self.distributor
    }

    /// Receive every event committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.broadcast.subscribe()
    }

    /// Flush the store to disk.
    pub fn flush(&self) -> Result<(), AccrueError> {
        self.ledger.with_store(|store| store.flush())??;
        Ok(())
    }
}

impl std::fmt::Debug for LedgerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerNode")
            .field("db_path", &self.config.db_path())
            .finish_non_exhaustive()
    }
}
