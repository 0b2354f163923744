//! Fixed-point accumulator arithmetic.
//!
//! The accumulator is the cumulative reward earned by one unit of eligible
//! share since genesis, scaled by [`SCALE`]. A participant's cumulative
//! entitlement at accumulator `acc` is `balance * acc / SCALE`; the unpaid
//! part is that minus the participant's baseline.
//!
//! All arithmetic is integer-only with u128 intermediates. Entitlements
//! round down and baselines round up, so the payout for any interval never
//! exceeds its exact share and rounding only ever leaves dust in the ledger.

use crate::constants::SCALE;
use crate::error::LedgerError;

/// `floor(a * b / d)` without requiring `a * b` to fit in a u128.
///
/// Splits `a = q*d + r` so the result is `q*b + floor(r*b / d)`. The second
/// product is bounded by `d * b`, which fits whenever `d` and `b` are below
/// 2^64. Returns `ArithmeticOverflow` only if the true result exceeds u128
/// or `d` is zero.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128, LedgerError> {
    if d == 0 {
        return Err(LedgerError::ArithmeticOverflow);
    }
    let q = a / d;
    let r = a % d;
    let high = q.checked_mul(b).ok_or(LedgerError::ArithmeticOverflow)?;
    let low = r.checked_mul(b).ok_or(LedgerError::ArithmeticOverflow)? / d;
    high.checked_add(low).ok_or(LedgerError::ArithmeticOverflow)
}

/// `ceil(a * b / d)`, with the same overflow behaviour as [`mul_div_floor`].
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Result<u128, LedgerError> {
    let floor = mul_div_floor(a, b, d)?;
    // a = q*d + r, so a*b divides evenly exactly when r*b does.
    let rem = (a % d).checked_mul(b).ok_or(LedgerError::ArithmeticOverflow)? % d;
    if rem == 0 {
        Ok(floor)
    } else {
        floor.checked_add(1).ok_or(LedgerError::ArithmeticOverflow)
    }
}

/// Cumulative reward attributable to `balance` at accumulator value `acc`.
///
/// Multiply-then-divide: `balance * acc / SCALE`.
pub fn cumulative(balance: u64, acc: u128) -> Result<u128, LedgerError> {
    mul_div_floor(acc, balance as u128, SCALE)
}

/// Baseline for `balance` at accumulator value `acc`: the cumulative
/// reward rounded up.
pub fn baseline(balance: u64, acc: u128) -> Result<u128, LedgerError> {
    mul_div_ceil(acc, balance as u128, SCALE)
}

/// Accumulator increase produced by depositing `amount` over `total_eligible` shares.
///
/// Callers must reject `total_eligible == 0` before getting here; a zero
/// divisor is reported as `NoEligibleShares`.
pub fn accumulator_increment(amount: u64, total_eligible: u128) -> Result<u128, LedgerError> {
    if total_eligible == 0 {
        return Err(LedgerError::NoEligibleShares);
    }
    let scaled = (amount as u128)
        .checked_mul(SCALE)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    Ok(scaled / total_eligible)
}

/// Reward accrued by a balance since its baseline, clamped at zero.
///
/// Not bounded by [`u64::MAX`]; a large enough accumulator move over a
/// large balance accrues more than one payout can carry.
pub fn unpaid(balance: u64, acc: u128, baseline: u128) -> Result<u128, LedgerError> {
    Ok(cumulative(balance, acc)?.saturating_sub(baseline))
}
