//! Observable ledger events.
//!
//! Events are published only after the state change that produced them has
//! been committed, so an auditor replaying them never sees a rolled-back
//! transfer.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::traits::EventSink;
use crate::types::{Amount, ParticipantId, Timestamp};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A payment source handed the ledger new rewards.
    RewardsDeposited {
        depositor: ParticipantId,
        amount: Amount,
        accumulator_per_share: u128,
    },
    /// Settlement paid a nonzero reward.
    RewardDistributed { participant: ParticipantId, amount: Amount },
    /// A participant ran a claim, whether or not anything was paid.
    RewardClaimed { participant: ParticipantId },
    Locked {
        participant: ParticipantId,
        amount: Amount,
        locked_at: Timestamp,
    },
    Unlocked { participant: ParticipantId, amount: Amount },
    ExclusionChanged { participant: ParticipantId, excluded: bool },
    TimeLockChanged { time_lock_secs: u64 },
}

impl LedgerEvent {
    /// Participant the event concerns, if any.
    pub fn participant(&self) -> Option<&ParticipantId> {
        match self {
            Self::RewardDistributed { participant, .. }
            | Self::RewardClaimed { participant }
            | Self::Locked { participant, .. }
            | Self::Unlocked { participant, .. }
            | Self::ExclusionChanged { participant, .. } => Some(participant),
            Self::RewardsDeposited { .. } | Self::TimeLockChanged { .. } => None,
        }
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &LedgerEvent) {}
}

/// In-memory event recorder.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<LedgerEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn publish(&self, event: &LedgerEvent) {
        self.events.lock().push(event.clone());
    }
}
