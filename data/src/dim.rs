//! Dimension sentinels and overflow-checked dimension arithmetic.
//!
//! Every shape computation goes through these helpers: a product that does
//! not fit in an i64 is an [`ResolutionError::Overflow`], never a wrapped
//! value. The `dim_*` variants additionally propagate [`UNKNOWN_DIM`]: if
//! any operand is unknown, so is the result.
use crate::errors::ResolutionError;
use num_integer::Integer;

/// A dimension whose value is not known at compile time.
pub const UNKNOWN_DIM: i64 = -1;

/// Sole element of a shape whose rank is not known.
pub const UNKNOWN_RANK: i64 = -2;

#[inline]
pub fn is_unknown(d: i64) -> bool {
    d == UNKNOWN_DIM
}

pub fn is_unknown_rank(shape: &[i64]) -> bool {
    shape == [UNKNOWN_RANK]
}

pub fn checked_add(a: i64, b: i64) -> Result<i64, ResolutionError> {
    a.checked_add(b).ok_or_else(|| ResolutionError::Overflow(format!("{a} + {b}")))
}

pub fn checked_sub(a: i64, b: i64) -> Result<i64, ResolutionError> {
    a.checked_sub(b).ok_or_else(|| ResolutionError::Overflow(format!("{a} - {b}")))
}

pub fn checked_mul(a: i64, b: i64) -> Result<i64, ResolutionError> {
    a.checked_mul(b).ok_or_else(|| ResolutionError::Overflow(format!("{a} * {b}")))
}

pub fn dim_add(a: i64, b: i64) -> Result<i64, ResolutionError> {
    if is_unknown(a) || is_unknown(b) { Ok(UNKNOWN_DIM) } else { checked_add(a, b) }
}

pub fn dim_mul(a: i64, b: i64) -> Result<i64, ResolutionError> {
    if is_unknown(a) || is_unknown(b) { Ok(UNKNOWN_DIM) } else { checked_mul(a, b) }
}

/// Product of several dimensions, unknown if any of them is.
pub fn dim_product(dims: &[i64]) -> Result<i64, ResolutionError> {
    dims.iter().try_fold(1, |acc, d| dim_mul(acc, *d))
}

/// Ceiling division. A non-positive divisor yields an unknown dimension.
pub fn dim_div_ceil(a: i64, b: i64) -> i64 {
    if is_unknown(a) || b <= 0 {
        return UNKNOWN_DIM;
    }
    Integer::div_ceil(&a, &b)
}

/// Least common multiple, overflow checked. `lcm(0, x)` is 0.
pub fn dim_lcm(a: i64, b: i64) -> Result<i64, ResolutionError> {
    if is_unknown(a) || is_unknown(b) {
        return Ok(UNKNOWN_DIM);
    }
    if a == 0 || b == 0 {
        return Ok(0);
    }
    let (a, b) = (a.abs(), b.abs());
    checked_mul(a / a.gcd(&b), b)
}
