//! Ledger constants. All durations are in seconds, all balances in base units.

/// Fixed-point scale of the per-share accumulator.
///
/// Balances and deposits are `u64`, so `amount * SCALE` always fits in a
/// `u128` (`u64::MAX * 10^18 < 2^124`).
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Time lock applied to a fresh ledger: 30 days.
pub const DEFAULT_TIME_LOCK_SECS: u64 = 30 * SECONDS_PER_DAY;

/// Upper bound accepted by `set_time_lock`: 365 days.
pub const MAX_TIME_LOCK_SECS: u64 = 365 * SECONDS_PER_DAY;
