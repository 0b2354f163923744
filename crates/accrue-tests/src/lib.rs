//! Adversarial and invariant test suite for the Accrue ledger.
//!
//! Integration tests drive the ledger through random operation sequences
//! and hostile collaborators, and check the bookkeeping after every step.

pub mod helpers;
