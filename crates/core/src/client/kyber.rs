use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use async_trait::async_trait;
use dxmm_abi::{IERC20Minimal, IKyberNetworkProxy};
use tracing::debug;

use crate::{
    error::{Error, MathError, StateError},
    types::{primitives::TokenAmount, rational::Rational},
    views::PriceFeed,
};

/// Kyber quotes whole-token rates scaled by this factor.
const KYBER_RATE_DECIMALS: u8 = 18;

pub struct KyberFeed<P>
where
    P: Provider + Clone,
{
    provider: P,
    proxy: Address,
}

impl<P> KyberFeed<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, proxy: Address) -> Self {
        Self { provider, proxy }
    }
}

fn pow10(exponent: u8) -> Result<U256, MathError> {
    U256::from(10u64)
        .checked_pow(U256::from(exponent))
        .ok_or(MathError::Overflow)
}

/// `expected_rate` whole `dest` per whole `src`, scaled by 1e18, as a
/// base-unit fraction: `rate * 10^dest_decimals / (1e18 * 10^src_decimals)`.
pub fn rate_to_base_units(
    expected_rate: U256,
    src_decimals: u8,
    dest_decimals: u8,
) -> Result<Rational, MathError> {
    if expected_rate.is_zero() {
        return Err(MathError::InvalidOraclePrice);
    }
    let num = expected_rate
        .checked_mul(pow10(dest_decimals)?)
        .ok_or(MathError::Overflow)?;
    let den = pow10(KYBER_RATE_DECIMALS)?
        .checked_mul(pow10(src_decimals)?)
        .ok_or(MathError::Overflow)?;
    Rational::new(num, den)
}

#[async_trait]
impl<P> PriceFeed for KyberFeed<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn quote(
        &self,
        src: Address,
        dest: Address,
        amount: TokenAmount,
    ) -> Result<Rational, Error> {
        let kyber = IKyberNetworkProxy::new(self.proxy, &self.provider);
        let src_token = IERC20Minimal::new(src, &self.provider);
        let dest_token = IERC20Minimal::new(dest, &self.provider);

        let (src_decimals, dest_decimals, rate) = self
            .provider
            .multicall()
            .add(src_token.decimals())
            .add(dest_token.decimals())
            .add(kyber.getExpectedRate(src, dest, amount.as_u256()))
            .aggregate()
            .await
            .map_err(StateError::from)?;

        debug!(%src, %dest, %amount, expected_rate = %rate.expectedRate, "reference quote");
        Ok(rate_to_base_units(
            rate.expectedRate,
            src_decimals,
            dest_decimals,
        )?)
    }
}
