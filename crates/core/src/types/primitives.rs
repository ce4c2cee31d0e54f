use std::fmt;

use alloy::primitives::{Address, U256};

use crate::error::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(U256);

impl TokenAmount {
    pub const ZERO: Self = Self(U256::ZERO);

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round number of an auction pair. Rounds start at 1; 0 is used as the
/// "nothing settled yet" cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AuctionIndex(u64);

impl AuctionIndex {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn from_u256(value: U256) -> Result<Self, StateError> {
        narrow_u64(value, "auction index").map(Self)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn as_u256(&self) -> U256 {
        U256::from(self.0)
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn prev(&self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for AuctionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Epoch seconds as reported by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn from_u256(value: U256) -> Result<Self, StateError> {
        narrow_u64(value, "auction start").map(Self)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn narrow_u64(value: U256, field: &'static str) -> Result<u64, StateError> {
    if value > U256::from(u64::MAX) {
        return Err(StateError::ValueOutOfRange { field });
    }
    Ok(value.to::<u64>())
}

/// One trading direction on the exchange: `sell_token` is auctioned for
/// `buy_token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenPair {
    pub sell_token: Address,
    pub buy_token: Address,
}

impl TokenPair {
    pub fn new(sell_token: Address, buy_token: Address) -> Self {
        Self {
            sell_token,
            buy_token,
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            sell_token: self.buy_token,
            buy_token: self.sell_token,
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.sell_token, self.buy_token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// token -> numeraire, the pair the agent sells into.
    Forward,
    /// numeraire -> token.
    Reverse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auction_index_rejects_values_beyond_u64() {
        let too_big = U256::from(u64::MAX) + U256::from(1u64);
        assert!(matches!(
            AuctionIndex::from_u256(too_big),
            Err(StateError::ValueOutOfRange { .. })
        ));
        assert_eq!(
            AuctionIndex::from_u256(U256::from(7u64)).unwrap(),
            AuctionIndex::new(7)
        );
    }

    #[test]
    fn token_amount_subtraction_saturates() {
        let small = TokenAmount::from(5);
        let large = TokenAmount::from(9);
        assert_eq!(small.saturating_sub(large), TokenAmount::ZERO);
        assert_eq!(large.saturating_sub(small), TokenAmount::from(4));
    }

    #[test]
    fn reversed_pair_swaps_tokens() {
        let pair = TokenPair::new(Address::repeat_byte(1), Address::repeat_byte(2));
        let rev = pair.reversed();
        assert_eq!(rev.sell_token, pair.buy_token);
        assert_eq!(rev.reversed(), pair);
    }
}
