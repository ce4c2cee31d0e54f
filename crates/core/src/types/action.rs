use alloy::primitives::{Address, B256};

use super::primitives::{AuctionIndex, Direction, TokenAmount, TokenPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimSide {
    /// Proceeds in the buy token for sell volume the holder put in.
    Seller,
    /// Sell tokens bought by the holder.
    Buyer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimCommand {
    pub direction: Direction,
    pub pair: TokenPair,
    pub round: AuctionIndex,
    pub side: ClaimSide,
    pub holder: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellReceipt {
    pub tx_hash: B256,
    pub auction_index: AuctionIndex,
    /// Net amount credited to the round after the exchange fee.
    pub amount: TokenAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyReceipt {
    pub tx_hash: B256,
    pub auction_index: AuctionIndex,
    pub amount: TokenAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub tx_hash: B256,
    pub returned: TokenAmount,
    pub frts_issued: TokenAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceReceipt {
    pub tx_hash: B256,
    pub new_balance: TokenAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: B256,
}
