use std::time::Duration;

use alloy::primitives::Address;

use super::primitives::{AuctionIndex, Direction, TokenPair};
use crate::error::ConfigError;

/// Addresses the agent is wired to. Fixed for the lifetime of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    pub exchange: Address,
    pub token: Address,
    pub numeraire: Address,
    pub price_feed: Address,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("exchange", self.exchange),
            ("token", self.token),
            ("numeraire", self.numeraire),
            ("price_feed", self.price_feed),
        ];
        for (field, address) in fields {
            if address == Address::ZERO {
                return Err(ConfigError::MissingAddress { field });
            }
        }
        Ok(())
    }

    pub fn pair(&self, direction: Direction) -> TokenPair {
        let forward = TokenPair::new(self.token, self.numeraire);
        match direction {
            Direction::Forward => forward,
            Direction::Reverse => forward.reversed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSettings {
    pub poll_interval: Duration,
    pub read_timeout: Duration,
    /// Rounds per direction examined for claims in one cycle.
    pub claim_scan_limit: u64,
    /// Last round treated as already settled on startup.
    pub claim_cursor_start: AuctionIndex,
    pub confirmations: u64,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(600),
            read_timeout: Duration::from_secs(30),
            claim_scan_limit: 32,
            claim_cursor_start: AuctionIndex::ZERO,
            confirmations: 1,
        }
    }
}
