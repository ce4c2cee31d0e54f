use alloy::primitives::U256;

use crate::{
    error::MathError,
    math::{add_fee, ceil_div_wide, narrow, widen},
    types::{
        primitives::TokenAmount, rational::Rational, snapshot::AuctionSnapshot,
        state::ParticipationState,
    },
};

/// Sell volume in token base units worth `usd_threshold`:
/// `ceil(usd * price.den / (oracle * price.num))`.
pub fn threshold_tokens(
    usd_threshold: U256,
    oracle_usd_per_numeraire: U256,
    last_price: Option<&Rational>,
) -> Result<TokenAmount, MathError> {
    if oracle_usd_per_numeraire.is_zero() {
        return Err(MathError::InvalidOraclePrice);
    }
    let price = last_price.ok_or(MathError::ZeroDenominator)?;
    if price.is_zero() {
        return Err(MathError::ZeroDenominator);
    }

    let numerator = widen(usd_threshold) * widen(price.denominator());
    let denominator = widen(oracle_usd_per_numeraire) * widen(price.numerator());
    let tokens = narrow(ceil_div_wide(numerator, denominator)?)?;
    Ok(TokenAmount::new(tokens))
}

pub fn snapshot_threshold(snapshot: &AuctionSnapshot) -> Result<TokenAmount, MathError> {
    threshold_tokens(
        snapshot.usd_threshold,
        snapshot.oracle_usd_per_numeraire,
        snapshot.last_closing_price.as_ref(),
    )
}

/// Token amount still needed in the current round before the exchange
/// schedules it. Zero once a round is scheduled or running.
pub fn missing_to_trigger(snapshot: &AuctionSnapshot) -> Result<TokenAmount, MathError> {
    let threshold = snapshot_threshold(snapshot)?;
    Ok(missing_for(
        threshold,
        snapshot.sell_volume,
        ParticipationState::classify(snapshot),
    ))
}

fn missing_for(
    threshold: TokenAmount,
    sell_volume: TokenAmount,
    state: ParticipationState,
) -> TokenAmount {
    match state {
        ParticipationState::NoAuctionTriggered => threshold.saturating_sub(sell_volume),
        ParticipationState::AuctionTriggeredWaiting { .. }
        | ParticipationState::AuctionInProgress => TokenAmount::ZERO,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPlan {
    pub threshold: TokenAmount,
    pub missing: TokenAmount,
    /// What to sell so that `missing` survives the exchange fee.
    pub gross: TokenAmount,
}

impl TriggerPlan {
    pub fn is_noop(&self) -> bool {
        self.missing.is_zero()
    }
}

pub fn plan_trigger(snapshot: &AuctionSnapshot) -> Result<TriggerPlan, MathError> {
    let threshold = snapshot_threshold(snapshot)?;
    let missing = missing_for(
        threshold,
        snapshot.sell_volume,
        ParticipationState::classify(snapshot),
    );
    let gross = TokenAmount::new(add_fee(missing.as_u256(), &snapshot.fee_ratio)?);
    Ok(TriggerPlan {
        threshold,
        missing,
        gross,
    })
}
