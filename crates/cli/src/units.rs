use std::str::FromStr;

use alloy::primitives::U256;
use dxmm_core::TokenAmount;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UnitsError {
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("amount must not be negative")]
    Negative,
    #[error("amount has {scale} decimal places, token supports {decimals}")]
    TooPrecise { scale: u32, decimals: u8 },
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

fn pow10(exponent: u32) -> Result<U256, UnitsError> {
    U256::from(10u64)
        .checked_pow(U256::from(exponent))
        .ok_or(UnitsError::Overflow)
}

/// Human amount (e.g. `"1.5"`) to base units of a token with `decimals`.
pub fn parse_amount(human: &str, decimals: u8) -> Result<TokenAmount, UnitsError> {
    let value =
        Decimal::from_str(human.trim()).map_err(|_| UnitsError::Invalid(human.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(UnitsError::Negative);
    }
    let value = value.normalize();
    let scale = value.scale();
    if scale > u32::from(decimals) {
        return Err(UnitsError::TooPrecise { scale, decimals });
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    mantissa
        .checked_mul(pow10(u32::from(decimals) - scale)?)
        .map(TokenAmount::new)
        .ok_or(UnitsError::Overflow)
}

/// Base units back to a human amount. Falls back to a `base units` label
/// when the value is beyond what `Decimal` can hold.
pub fn format_amount(amount: TokenAmount, decimals: u8) -> String {
    let raw = amount.as_u256();
    let exact = u128::try_from(raw)
        .ok()
        .and_then(|raw| i128::try_from(raw).ok())
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, u32::from(decimals)).ok());
    match exact {
        Some(value) => value.normalize().to_string(),
        None => format!("{raw} base units"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(
            parse_amount("1.5", 18).unwrap(),
            TokenAmount::new(U256::from(1_500_000_000_000_000_000u128))
        );
        assert_eq!(parse_amount("42", 0).unwrap(), TokenAmount::from(42));
        assert_eq!(parse_amount(" 0.000001 ", 6).unwrap(), TokenAmount::from(1));
        assert_eq!(parse_amount("2.500", 2).unwrap(), TokenAmount::from(250));
    }

    #[test]
    fn rejects_more_precision_than_the_token_has() {
        assert_eq!(
            parse_amount("0.001", 2),
            Err(UnitsError::TooPrecise {
                scale: 3,
                decimals: 2
            })
        );
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert_eq!(parse_amount("-1", 18), Err(UnitsError::Negative));
        assert!(matches!(
            parse_amount("one", 18),
            Err(UnitsError::Invalid(_))
        ));
    }

    #[test]
    fn formats_base_units_for_humans() {
        assert_eq!(format_amount(TokenAmount::from(1_005), 3), "1.005");
        assert_eq!(format_amount(TokenAmount::from(2_000), 3), "2");
        assert_eq!(format_amount(TokenAmount::ZERO, 18), "0");
    }

    #[test]
    fn formats_huge_values_as_base_units() {
        let huge = TokenAmount::new(U256::MAX);
        assert!(format_amount(huge, 18).ends_with("base units"));
    }
}
