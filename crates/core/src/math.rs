//! Exact integer helpers. Products are taken in 512 bits and every result
//! is narrowed back to 256 bits with an explicit overflow check.

use alloy::primitives::{U256, U512};

use crate::{error::MathError, types::rational::Rational};

pub fn widen(value: U256) -> U512 {
    let l = value.as_limbs();
    U512::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0])
}

pub fn narrow(value: U512) -> Result<U256, MathError> {
    let l = value.as_limbs();
    if l[4..].iter().any(|limb| *limb != 0) {
        return Err(MathError::Overflow);
    }
    Ok(U256::from_limbs([l[0], l[1], l[2], l[3]]))
}

pub fn ceil_div(numerator: U256, denominator: U256) -> Result<U256, MathError> {
    narrow(ceil_div_wide(widen(numerator), widen(denominator))?)
}

pub(crate) fn ceil_div_wide(numerator: U512, denominator: U512) -> Result<U512, MathError> {
    if denominator.is_zero() {
        return Err(MathError::ZeroDenominator);
    }
    let quotient = numerator / denominator;
    if (numerator % denominator).is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U512::from(1u64))
    }
}

fn check_fee_ratio(fee_ratio: &Rational) -> Result<(), MathError> {
    if fee_ratio.numerator() >= fee_ratio.denominator() {
        return Err(MathError::InvalidFeeRatio {
            num: fee_ratio.numerator(),
            den: fee_ratio.denominator(),
        });
    }
    Ok(())
}

/// Smallest gross amount whose post-fee remainder is at least `net`:
/// `ceil(net * den / (den - num))`.
pub fn add_fee(net: U256, fee_ratio: &Rational) -> Result<U256, MathError> {
    check_fee_ratio(fee_ratio)?;
    if net.is_zero() {
        return Ok(U256::ZERO);
    }
    let den = fee_ratio.denominator();
    let kept = den - fee_ratio.numerator();
    narrow(ceil_div_wide(widen(net) * widen(den), widen(kept))?)
}

/// What the exchange deducts from a `gross` order: `floor(gross * num / den)`.
pub fn fee_of(gross: U256, fee_ratio: &Rational) -> Result<U256, MathError> {
    check_fee_ratio(fee_ratio)?;
    fee_ratio.mul_floor(gross)
}

pub fn net_after_fee(gross: U256, fee_ratio: &Rational) -> Result<U256, MathError> {
    Ok(gross - fee_of(gross, fee_ratio)?)
}
