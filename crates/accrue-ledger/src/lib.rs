//! # accrue-ledger: Share ledger and reward distributor.
//!
//! All calculations use integer arithmetic only.
//!
//! - [`ShareLedger`] owns every balance and the global reward accumulator:
//!   lock, unlock, exclusion, time lock, and the settlement primitive.
//! - [`RewardDistributor`] deposits rewards into the accumulator and runs
//!   claims on top of the ledger's settlement.
//!
//! Each public operation runs under one ledger-wide lock. Inside it, state
//! changes are staged in a transaction and committed as one atomic store
//! write; external transfers run after staging and a failed transfer drops
//! the staged changes.

pub mod distributor;
pub mod ledger;
pub mod services;
mod settlement;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod txn;

pub use distributor::RewardDistributor;
pub use ledger::ShareLedger;
pub use services::Services;
