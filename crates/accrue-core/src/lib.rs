//! # accrue-core
//! Foundation types and traits for the Accrue reward ledger.

pub mod auth;
pub mod clock;
pub mod constants;
pub mod error;
pub mod events;
pub mod math;
pub mod state;
pub mod store;
pub mod traits;
pub mod types;
