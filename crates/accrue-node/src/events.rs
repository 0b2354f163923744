//! Event sinks for a running ledger.
//!
//! - [`BroadcastSink`] fans committed events out to async subscribers over a
//!   tokio broadcast channel. Slow subscribers lag and lose the oldest events.
//! - [`AuditLogSink`] appends one JSON object per event to a file.
//! - [`FanoutSink`] forwards each event to several sinks in order.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{trace, warn};

use accrue_core::error::StorageError;
use accrue_core::events::LedgerEvent;
use accrue_core::traits::EventSink;

pub struct BroadcastSink {
    tx: broadcast::Sender<LedgerEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// A receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &LedgerEvent) {
        // An error only means nobody is listening.
        if self.tx.send(event.clone()).is_err() {
            trace!("event dropped: no subscribers");
        }
    }
}

/// One line of the audit log.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuditRecord {
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

/// Appends events to a JSON-lines file, flushing after every line.
pub struct AuditLogSink {
    out: Mutex<BufWriter<File>>,
}

impl AuditLogSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|e| StorageError::Backend(format!("{}: {e}", path.as_ref().display())))?;
        Ok(Self {
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_record(&self, record: &AuditRecord) -> std::io::Result<()> {
        let mut out = self.out.lock();
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

impl EventSink for AuditLogSink {
    fn publish(&self, event: &LedgerEvent) {
        let record = AuditRecord {
            recorded_at: Utc::now(),
            event: event.clone(),
        };
        if let Err(e) = self.write_record(&record) {
            warn!(error = %e, "failed to append audit record");
        }
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn publish(&self, event: &LedgerEvent) {
        for sink in &self.sinks {
            sink.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_core::events::EventLog;
    use accrue_core::types::ParticipantId;

    fn claimed(label: &str) -> LedgerEvent {
        LedgerEvent::RewardClaimed {
            participant: ParticipantId::from_label(label),
        }
    }

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        let sink = BroadcastSink::new(4);
        sink.publish(&claimed("a"));
        assert_eq!(sink.receiver_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_delivers_in_order() {
        let sink = BroadcastSink::new(4);
        let mut rx = sink.subscribe();
        sink.publish(&claimed("a"));
        sink.publish(&claimed("b"));
        assert_eq!(rx.recv().await.unwrap(), claimed("a"));
        assert_eq!(rx.recv().await.unwrap(), claimed("b"));
    }

    #[test]
    fn audit_log_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let big = LedgerEvent::RewardsDeposited {
            depositor: ParticipantId::from_label("d"),
            amount: 5,
            accumulator_per_share: u128::MAX,
        };
        {
            let sink = AuditLogSink::open(&path).unwrap();
            sink.publish(&claimed("a"));
            sink.publish(&big);
        }
        // Reopening appends rather than truncating.
        AuditLogSink::open(&path).unwrap().publish(&claimed("b"));

        let text = std::fs::read_to_string(&path).unwrap();
        let events: Vec<LedgerEvent> = text
            .lines()
            .map(|line| serde_json::from_str::<AuditRecord>(line).unwrap().event)
            .collect();
        assert_eq!(events, vec![claimed("a"), big, claimed("b")]);
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Arc::new(EventLog::new());
        let b = Arc::new(EventLog::new());
        let fanout = FanoutSink::new().with(a.clone()).with(b.clone());
        assert_eq!(fanout.len(), 2);
        fanout.publish(&claimed("x"));
        assert_eq!(a.snapshot(), vec![claimed("x")]);
        assert_eq!(b.snapshot(), vec![claimed("x")]);
    }
}
