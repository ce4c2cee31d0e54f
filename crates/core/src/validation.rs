use alloy::primitives::Address;

use crate::{
    error::ValidationError,
    types::{primitives::TokenAmount, snapshot::Balances},
};

/// Where a trigger sell is paid from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingSource {
    /// Token already credited on the exchange; sold with `postSellOrder`.
    ExchangeBalance,
    /// Token in the agent's wallet; moved in with `depositAndSell`.
    Custody,
}

pub fn validate_amount(amount: TokenAmount) -> Result<(), ValidationError> {
    if amount.is_zero() {
        return Err(ValidationError::AmountIsZero);
    }
    Ok(())
}

pub fn ensure_balance(
    asset: Address,
    required: TokenAmount,
    available: TokenAmount,
) -> Result<(), ValidationError> {
    if available < required {
        return Err(ValidationError::InsufficientBalance {
            asset,
            required,
            available,
        });
    }
    Ok(())
}

pub fn choose_sell_funding(
    token: Address,
    balances: &Balances,
    gross: TokenAmount,
) -> Result<FundingSource, ValidationError> {
    validate_amount(gross)?;
    if balances.exchange.token >= gross {
        return Ok(FundingSource::ExchangeBalance);
    }
    if balances.custody.token >= gross {
        return Ok(FundingSource::Custody);
    }
    Err(ValidationError::InsufficientBalance {
        asset: token,
        required: gross,
        available: balances.exchange.token.max(balances.custody.token),
    })
}

pub fn validate_buy_back(
    numeraire: Address,
    balances: &Balances,
    gross: TokenAmount,
) -> Result<(), ValidationError> {
    validate_amount(gross)?;
    ensure_balance(numeraire, gross, balances.exchange.numeraire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::snapshot::AssetBalances;

    fn balances(exchange_token: u64, custody_token: u64) -> Balances {
        Balances {
            exchange: AssetBalances {
                token: TokenAmount::from(exchange_token),
                numeraire: TokenAmount::from(50),
            },
            custody: AssetBalances {
                token: TokenAmount::from(custody_token),
                numeraire: TokenAmount::ZERO,
            },
        }
    }

    #[test]
    fn exchange_balance_is_preferred() {
        let token = Address::repeat_byte(2);
        assert_eq!(
            choose_sell_funding(token, &balances(100, 100), TokenAmount::from(100)),
            Ok(FundingSource::ExchangeBalance)
        );
        assert_eq!(
            choose_sell_funding(token, &balances(99, 100), TokenAmount::from(100)),
            Ok(FundingSource::Custody)
        );
    }

    #[test]
    fn neither_source_sufficient() {
        let token = Address::repeat_byte(2);
        assert_eq!(
            choose_sell_funding(token, &balances(60, 70), TokenAmount::from(100)),
            Err(ValidationError::InsufficientBalance {
                asset: token,
                required: TokenAmount::from(100),
                available: TokenAmount::from(70),
            })
        );
    }

    #[test]
    fn buy_back_needs_exchange_numeraire() {
        let numeraire = Address::repeat_byte(3);
        assert!(validate_buy_back(numeraire, &balances(0, 0), TokenAmount::from(50)).is_ok());
        assert!(matches!(
            validate_buy_back(numeraire, &balances(0, 0), TokenAmount::from(51)),
            Err(ValidationError::InsufficientBalance { .. })
        ));
        assert_eq!(
            validate_buy_back(numeraire, &balances(0, 0), TokenAmount::ZERO),
            Err(ValidationError::AmountIsZero)
        );
    }
}
