use crate::{
    error::MathError,
    math::add_fee,
    types::{
        primitives::{AuctionIndex, TokenAmount},
        rational::Rational,
        snapshot::AuctionSnapshot,
    },
};

/// Buying at the auction pays off when its price does not exceed what the
/// reference feed quotes for the same trade. Equal prices buy.
pub fn should_buy_back(auction_price: &Rational, reference_rate: &Rational) -> bool {
    auction_price.is_at_most(reference_rate)
}

/// Numeraire still needed to buy out the round at `price`:
/// `floor(sell_volume * price) - buy_volume`, floored at zero.
pub fn remaining_buy_volume(
    sell_volume: TokenAmount,
    buy_volume: TokenAmount,
    price: &Rational,
) -> Result<TokenAmount, MathError> {
    let owed = TokenAmount::new(price.mul_floor(sell_volume.as_u256())?);
    Ok(owed.saturating_sub(buy_volume))
}

/// Sell volume not yet matched by buy orders, in token units.
pub fn remaining_sell_volume(
    sell_volume: TokenAmount,
    buy_volume: TokenAmount,
    price: &Rational,
) -> Result<TokenAmount, MathError> {
    if price.is_zero() {
        return Ok(sell_volume);
    }
    let matched = TokenAmount::new(price.div_floor(buy_volume.as_u256())?);
    Ok(sell_volume.saturating_sub(matched))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyBackPlan {
    pub round: AuctionIndex,
    pub price: Rational,
    pub reference: Rational,
    pub remaining_buy: TokenAmount,
    /// Order size; the exchange caps it at the outstanding volume.
    pub gross: TokenAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyBackDecision {
    Buy(BuyBackPlan),
    Hold { price: Rational, reference: Rational },
    NothingOutstanding,
}

pub fn plan_buy_back(
    snapshot: &AuctionSnapshot,
    price: Rational,
    reference: Rational,
) -> Result<BuyBackDecision, MathError> {
    if !should_buy_back(&price, &reference) {
        return Ok(BuyBackDecision::Hold { price, reference });
    }

    let remaining_buy = remaining_buy_volume(snapshot.sell_volume, snapshot.buy_volume, &price)?;
    if remaining_buy.is_zero() {
        return Ok(BuyBackDecision::NothingOutstanding);
    }
    let gross = TokenAmount::new(add_fee(remaining_buy.as_u256(), &snapshot.fee_ratio)?);

    Ok(BuyBackDecision::Buy(BuyBackPlan {
        round: snapshot.auction_index,
        price,
        reference,
        remaining_buy,
        gross,
    }))
}
