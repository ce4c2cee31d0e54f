use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{
    claims::ClaimCursor,
    error::Error,
    types::{
        action::{BalanceReceipt, BuyReceipt, ClaimReceipt, SellReceipt, TransferReceipt},
        primitives::{AuctionIndex, TokenAmount, TokenPair},
        rational::Rational,
        snapshot::{AuctionSnapshot, RoundMarker},
    },
};

/// Read side of the exchange, bound to one holder and one token pair.
#[async_trait]
pub trait ExchangeView: Send + Sync {
    /// Reads everything one cycle needs at a single block. Positions are
    /// loaded for the rounds `cursor.window(.., scan_limit)` selects.
    async fn fetch_snapshot(
        &self,
        cursor: &ClaimCursor,
        scan_limit: u64,
    ) -> Result<AuctionSnapshot, Error>;

    async fn fetch_marker(&self) -> Result<RoundMarker, Error>;

    async fn closing_price(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
    ) -> Result<Option<Rational>, Error>;

    async fn exchange_balance(&self, asset: Address) -> Result<TokenAmount, Error>;
}

/// State-changing exchange entrypoints. Each call is confirmed before it
/// returns; a revert leaves the exchange unchanged.
#[async_trait]
pub trait ExchangeCommands: Send + Sync {
    async fn deposit(&self, asset: Address, amount: TokenAmount) -> Result<BalanceReceipt, Error>;

    async fn withdraw(&self, asset: Address, amount: TokenAmount)
    -> Result<BalanceReceipt, Error>;

    async fn deposit_and_sell(
        &self,
        pair: TokenPair,
        amount: TokenAmount,
    ) -> Result<SellReceipt, Error>;

    async fn post_sell_order(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
        amount: TokenAmount,
    ) -> Result<SellReceipt, Error>;

    async fn post_buy_order(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
        amount: TokenAmount,
    ) -> Result<BuyReceipt, Error>;

    async fn claim_seller_funds(
        &self,
        pair: TokenPair,
        holder: Address,
        round: AuctionIndex,
    ) -> Result<ClaimReceipt, Error>;

    async fn claim_buyer_funds(
        &self,
        pair: TokenPair,
        holder: Address,
        round: AuctionIndex,
    ) -> Result<ClaimReceipt, Error>;
}

/// The holder's own wallet.
#[async_trait]
pub trait Custody: Send + Sync {
    async fn custody_balance(&self, asset: Address) -> Result<TokenAmount, Error>;

    async fn transfer_from_custody(
        &self,
        asset: Address,
        amount: TokenAmount,
        to: Address,
    ) -> Result<TransferReceipt, Error>;
}

pub trait Exchange: ExchangeView + ExchangeCommands + Custody {}

impl<T> Exchange for T where T: ExchangeView + ExchangeCommands + Custody {}
