//! # accrue-node: Persistent ledger composition.
//!
//! Wires the share ledger to durable storage and observers:
//! - [`storage::RocksLedgerStore`]: ledger records backed by RocksDB
//! - [`config::LedgerConfig`]: file and environment configuration
//! - [`events`]: broadcast, audit-log, and fan-out event sinks
//! - [`node::LedgerNode`]: a ready-to-use ledger and distributor pair
//! - [`logging::init_logging`]: `tracing` subscriber setup

pub mod config;
pub mod events;
pub mod logging;
pub mod node;
pub mod storage;

pub use config::{ConfigError, LedgerConfig};
pub use node::LedgerNode;
pub use storage::RocksLedgerStore;
