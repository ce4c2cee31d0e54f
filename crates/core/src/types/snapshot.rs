use std::fmt;

use alloy::primitives::{Address, U256};

use super::{
    primitives::{AuctionIndex, Direction, Timestamp, TokenAmount, TokenPair},
    rational::Rational,
};

/// Holder balances of token and numeraire in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetBalances {
    pub token: TokenAmount,
    pub numeraire: TokenAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    /// Credited on the exchange ledger.
    pub exchange: AssetBalances,
    /// Held by the agent's own wallet.
    pub custody: AssetBalances,
}

/// Inclusive range of rounds; empty when `first > last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRange {
    pub first: AuctionIndex,
    pub last: AuctionIndex,
}

impl RoundRange {
    pub fn empty() -> Self {
        Self {
            first: AuctionIndex::new(1),
            last: AuctionIndex::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    pub fn rounds(&self) -> impl Iterator<Item = AuctionIndex> + use<> {
        (self.first.as_u64()..=self.last.as_u64()).map(AuctionIndex::new)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimWindow {
    pub forward: RoundRange,
    pub reverse: RoundRange,
}

impl ClaimWindow {
    pub fn range(&self, direction: Direction) -> RoundRange {
        match direction {
            Direction::Forward => self.forward,
            Direction::Reverse => self.reverse,
        }
    }
}

/// Holder's stake in one side of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPosition {
    pub direction: Direction,
    pub round: AuctionIndex,
    pub seller_balance: TokenAmount,
    pub buyer_balance: TokenAmount,
    /// `None` until the round clears.
    pub closing_price: Option<Rational>,
}

impl AccountPosition {
    pub fn is_closed(&self) -> bool {
        self.closing_price.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.seller_balance.is_zero() && self.buyer_balance.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundMarker {
    pub auction_index: AuctionIndex,
    pub auction_start: Timestamp,
}

impl fmt::Display for RoundMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round {} (start {})",
            self.auction_index, self.auction_start
        )
    }
}

/// Exchange state relevant to one holder, read at a single block.
#[derive(Debug, Clone)]
pub struct AuctionSnapshot {
    pub block_number: u64,
    pub current_time: Timestamp,
    pub holder: Address,
    /// token -> numeraire.
    pub pair: TokenPair,
    pub auction_index: AuctionIndex,
    pub reverse_auction_index: AuctionIndex,
    pub auction_start: Timestamp,
    pub sell_volume: TokenAmount,
    pub buy_volume: TokenAmount,
    pub current_price: Option<Rational>,
    pub usd_threshold: U256,
    pub oracle_usd_per_numeraire: U256,
    pub last_closing_price: Option<Rational>,
    pub fee_ratio: Rational,
    pub balances: Balances,
    pub claim_window: ClaimWindow,
    pub positions: Vec<AccountPosition>,
}

impl AuctionSnapshot {
    pub fn marker(&self) -> RoundMarker {
        RoundMarker {
            auction_index: self.auction_index,
            auction_start: self.auction_start,
        }
    }

    pub fn pair_for(&self, direction: Direction) -> TokenPair {
        match direction {
            Direction::Forward => self.pair,
            Direction::Reverse => self.pair.reversed(),
        }
    }

    pub fn current_index(&self, direction: Direction) -> AuctionIndex {
        match direction {
            Direction::Forward => self.auction_index,
            Direction::Reverse => self.reverse_auction_index,
        }
    }

    pub fn positions_for(&self, direction: Direction) -> impl Iterator<Item = &AccountPosition> {
        self.positions
            .iter()
            .filter(move |position| position.direction == direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_yields_no_rounds() {
        let range = RoundRange::empty();
        assert!(range.is_empty());
        assert_eq!(range.rounds().count(), 0);
    }

    #[test]
    fn range_is_inclusive() {
        let range = RoundRange {
            first: AuctionIndex::new(2),
            last: AuctionIndex::new(4),
        };
        let rounds: Vec<u64> = range.rounds().map(|r| r.as_u64()).collect();
        assert_eq!(rounds, vec![2, 3, 4]);
    }
}
