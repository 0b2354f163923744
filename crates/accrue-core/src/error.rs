//! Error types for the Accrue ledger.
use thiserror::Error;

use crate::types::ParticipantId;

/// Failure reported by an external collaborator (balance transfer service
/// or payment sink).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
    #[error("rejected by receiver: {0}")] Rejected(String),
    #[error("service unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("backend: {0}")] Backend(String),
    #[error("codec: {0}")] Codec(String),
    #[error("corrupt record: {0}")] Corrupt(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("time lock active until {unlock_at} (now {now})")] TimeLockActive { unlock_at: u64, now: u64 },
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("nothing locked")] NothingLocked,
    #[error("exclusion already set to {0}")] NoOpExclusionChange(bool),
    #[error("duration too long: {requested}s > {max}s")] DurationTooLong { requested: u64, max: u64 },
    #[error("zero deposit")] ZeroDeposit,
    #[error("no eligible shares")] NoEligibleShares,
    #[error("transfer of {amount} to {participant} failed: {source}")] TransferFailed { participant: ParticipantId, amount: u64, source: TransferError },
    #[error("unauthorized caller: {0}")] Unauthorized(ParticipantId),
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("ledger re-entered during an in-flight operation")] Reentrancy,
    #[error(transparent)] Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum AccrueError {
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Storage(#[from] StorageError),
    #[error("config: {0}")] Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_time_lock_active() {
        let e = LedgerError::TimeLockActive { unlock_at: 200, now: 100 };
        assert_eq!(e.to_string(), "time lock active until 200 (now 100)");
    }

    #[test]
    fn display_transfer_failed_includes_source() {
        let e = LedgerError::TransferFailed {
            participant: ParticipantId::ZERO,
            amount: 7,
            source: TransferError::Rejected("closed".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("transfer of 7"));
        assert!(msg.contains("rejected by receiver: closed"));
    }

    #[test]
    fn storage_converts_into_ledger_error() {
        let e: LedgerError = StorageError::Backend("io".into()).into();
        assert_eq!(e, LedgerError::Storage(StorageError::Backend("io".into())));
    }

    #[test]
    fn ledger_converts_into_top_level() {
        let e: AccrueError = LedgerError::ZeroDeposit.into();
        assert!(matches!(e, AccrueError::Ledger(LedgerError::ZeroDeposit)));
        assert_eq!(e.to_string(), "zero deposit");
    }
}
