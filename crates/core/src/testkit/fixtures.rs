use alloy::primitives::{Address, U256};

use crate::{
    access::AccessControl,
    types::{
        config::AgentConfig,
        primitives::{AuctionIndex, Timestamp, TokenAmount, TokenPair},
        rational::Rational,
        snapshot::{AuctionSnapshot, Balances, ClaimWindow, RoundRange},
    },
};

pub fn exchange_address() -> Address {
    Address::repeat_byte(0x01)
}

pub fn token_address() -> Address {
    Address::repeat_byte(0x02)
}

pub fn numeraire_address() -> Address {
    Address::repeat_byte(0x03)
}

pub fn feed_address() -> Address {
    Address::repeat_byte(0x04)
}

pub fn admin_address() -> Address {
    Address::repeat_byte(0xad)
}

pub fn operator_address() -> Address {
    Address::repeat_byte(0x0e)
}

/// The wallet the agent trades from.
pub fn holder_address() -> Address {
    Address::repeat_byte(0x0a)
}

pub fn agent_config() -> AgentConfig {
    AgentConfig {
        exchange: exchange_address(),
        token: token_address(),
        numeraire: numeraire_address(),
        price_feed: feed_address(),
    }
}

pub fn access_control() -> AccessControl {
    match AccessControl::new(admin_address(), [operator_address()]) {
        Ok(access) => access,
        Err(err) => panic!("fixture admin must be non-zero: {err}"),
    }
}

pub fn rational(num: u64, den: u64) -> Rational {
    match Rational::from_u64(num, den) {
        Ok(value) => value,
        Err(err) => panic!("fixture rational {num}/{den}: {err}"),
    }
}

/// Untriggered round 1 with a 1000 token threshold and no positions.
pub fn snapshot_fixture() -> AuctionSnapshot {
    AuctionSnapshot {
        block_number: 100,
        current_time: Timestamp::new(10_000),
        holder: holder_address(),
        pair: TokenPair::new(token_address(), numeraire_address()),
        auction_index: AuctionIndex::new(1),
        reverse_auction_index: AuctionIndex::new(1),
        auction_start: Timestamp::new(1),
        sell_volume: TokenAmount::ZERO,
        buy_volume: TokenAmount::ZERO,
        current_price: None,
        usd_threshold: U256::from(1000u64),
        oracle_usd_per_numeraire: U256::from(1u64),
        last_closing_price: Some(rational(1, 1)),
        fee_ratio: rational(1, 201),
        balances: Balances::default(),
        claim_window: ClaimWindow {
            forward: RoundRange::empty(),
            reverse: RoundRange::empty(),
        },
        positions: Vec::new(),
    }
}
