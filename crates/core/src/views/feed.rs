use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{error::Error, types::primitives::TokenAmount, types::rational::Rational};

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Units of `dest` per unit of `src`, both in base units, for a trade
    /// of `amount` of `src`. A zero rate is `InvalidOraclePrice`.
    async fn quote(&self, src: Address, dest: Address, amount: TokenAmount)
    -> Result<Rational, Error>;
}
