//! The external collaborators a ledger is wired to.

use std::sync::Arc;

use accrue_core::clock::SystemClock;
use accrue_core::events::NullSink;
use accrue_core::traits::{Authorizer, BalanceTransfer, Clock, EventSink, PaymentSink};

/// Collaborator handles shared by a [`ShareLedger`](crate::ShareLedger).
///
/// Defaults to the wall clock and a sink that drops events.
#[derive(Clone)]
pub struct Services {
    pub transfer: Arc<dyn BalanceTransfer>,
    pub payments: Arc<dyn PaymentSink>,
    pub authorizer: Arc<dyn Authorizer>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

impl Services {
    pub fn new(
        transfer: Arc<dyn BalanceTransfer>,
        payments: Arc<dyn PaymentSink>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            transfer,
            payments,
            authorizer,
            clock: Arc::new(SystemClock),
            events: Arc::new(NullSink),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
