use std::{cmp::Ordering, fmt};

use alloy::primitives::U256;

use crate::{
    error::MathError,
    math::{narrow, widen},
};

/// Exact non-negative fraction. The denominator is never zero.
///
/// Equality is structural (`1/2 != 2/4`); use [`Rational::cmp_value`] to
/// compare the values two fractions represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: U256,
    den: U256,
}

impl Rational {
    pub fn new(num: U256, den: U256) -> Result<Self, MathError> {
        if den.is_zero() {
            return Err(MathError::ZeroDenominator);
        }
        Ok(Self { num, den })
    }

    pub fn from_u64(num: u64, den: u64) -> Result<Self, MathError> {
        Self::new(U256::from(num), U256::from(den))
    }

    /// Exchange fractions use a zero denominator for "not set yet".
    pub fn from_exchange(num: U256, den: U256) -> Option<Self> {
        Self::new(num, den).ok()
    }

    pub fn numerator(&self) -> U256 {
        self.num
    }

    pub fn denominator(&self) -> U256 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn inverse(&self) -> Result<Self, MathError> {
        Self::new(self.den, self.num)
    }

    /// Compares by cross-multiplication in 512 bits, so no precision is lost.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        let lhs = widen(self.num) * widen(other.den);
        let rhs = widen(other.num) * widen(self.den);
        lhs.cmp(&rhs)
    }

    pub fn is_at_most(&self, other: &Self) -> bool {
        self.cmp_value(other) != Ordering::Greater
    }

    /// `floor(amount * num / den)`.
    pub fn mul_floor(&self, amount: U256) -> Result<U256, MathError> {
        narrow(widen(amount) * widen(self.num) / widen(self.den))
    }

    /// `floor(amount * den / num)`, i.e. `amount` divided by this fraction.
    pub fn div_floor(&self, amount: U256) -> Result<U256, MathError> {
        if self.num.is_zero() {
            return Err(MathError::ZeroDenominator);
        }
        narrow(widen(amount) * widen(self.den) / widen(self.num))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(num: u64, den: u64) -> Rational {
        Rational::from_u64(num, den).unwrap()
    }

    #[test]
    fn rejects_zero_denominator() {
        assert_eq!(Rational::from_u64(1, 0), Err(MathError::ZeroDenominator));
        assert!(Rational::from_exchange(U256::ZERO, U256::ZERO).is_none());
    }

    #[test]
    fn compares_values_not_representations() {
        assert_eq!(r(1, 2).cmp_value(&r(2, 4)), Ordering::Equal);
        assert_eq!(r(1, 3).cmp_value(&r(1, 2)), Ordering::Less);
        assert_eq!(r(7, 5).cmp_value(&r(4, 3)), Ordering::Greater);
        assert_ne!(r(1, 2), r(2, 4));
    }

    #[test]
    fn cross_multiplication_does_not_overflow() {
        let huge = Rational::new(U256::MAX, U256::MAX - U256::from(1u64)).unwrap();
        let one = r(1, 1);
        assert_eq!(huge.cmp_value(&one), Ordering::Greater);
        assert!(one.is_at_most(&huge));
    }

    #[test]
    fn floor_scaling() {
        let price = r(2, 3);
        assert_eq!(price.mul_floor(U256::from(10u64)).unwrap(), U256::from(6u64));
        assert_eq!(price.div_floor(U256::from(10u64)).unwrap(), U256::from(15u64));
        assert_eq!(
            r(0, 1).div_floor(U256::from(1u64)),
            Err(MathError::ZeroDenominator)
        );
    }
}
