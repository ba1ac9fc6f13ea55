//! WAD fixed point with 256-bit intermediates.
//!
//! Amounts and factors are `u128`; products are formed in `U256` so that
//! `amount · factor` never overflows before the division. Results that do
//! not fit back into `u128` are reported as [`MathError::Overflow`].

use ethnum::U256;

use crate::error::MathError;

/// Fixed-point denominator: `1.0 == WAD`.
pub const WAD: u128 = 1_000_000_000_000_000_000;

fn narrow(value: U256) -> Result<u128, MathError> {
    let (hi, lo) = value.into_words();
    if hi != 0 {
        return Err(MathError::Overflow);
    }
    Ok(lo)
}

/// Direction a division rounds in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

fn div_rounded(numerator: U256, denominator: U256, rounding: Rounding) -> Result<u128, MathError> {
    let mut quotient = numerator / denominator;
    if rounding == Rounding::Up && numerator % denominator != U256::ZERO {
        quotient += U256::ONE;
    }
    narrow(quotient)
}

/// `floor(a · b / denominator)`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(denominator))
}

/// `ceil(a · b / denominator)`.
pub fn mul_div_up(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    div_rounded(U256::from(a) * U256::from(b), U256::from(denominator), Rounding::Up)
}

/// `a · b / denominator` rounded in `rounding`'s direction.
pub fn mul_div_rounded(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    div_rounded(U256::from(a) * U256::from(b), U256::from(denominator), rounding)
}

/// `floor(a · b · c / (d1 · d2))`.
///
/// Used where a difference of pool factors is applied to a principal and
/// rescaled by the fee index in one step, keeping a single truncation.
pub fn mul_mul_div(a: u128, b: u128, c: u128, d1: u128, d2: u128) -> Result<u128, MathError> {
    mul_mul_div_rounded(a, b, c, d1, d2, Rounding::Down)
}

/// `a · b · c / (d1 · d2)` rounded in `rounding`'s direction.
pub fn mul_mul_div_rounded(
    a: u128,
    b: u128,
    c: u128,
    d1: u128,
    d2: u128,
    rounding: Rounding,
) -> Result<u128, MathError> {
    if d1 == 0 || d2 == 0 {
        return Err(MathError::DivisionByZero);
    }
    let numerator = (U256::from(a) * U256::from(b))
        .checked_mul(U256::from(c))
        .ok_or(MathError::Overflow)?;
    div_rounded(numerator, U256::from(d1) * U256::from(d2), rounding)
}
