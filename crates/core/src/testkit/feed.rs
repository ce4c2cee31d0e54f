use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{
    error::{Error, MathError},
    types::{primitives::TokenAmount, rational::Rational},
    views::PriceFeed,
};

#[derive(Debug, Default)]
struct FeedState {
    rate: Option<Rational>,
    quotes: Vec<(Address, Address, TokenAmount)>,
}

/// Reference feed returning a fixed rate. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockFeed {
    state: Arc<Mutex<FeedState>>,
}

impl MockFeed {
    pub fn with_rate(rate: Rational) -> Self {
        let feed = Self::default();
        feed.set_rate(rate);
        feed
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_rate(&self, rate: Rational) {
        self.lock().rate = Some(rate);
    }

    /// Every `(src, dest, amount)` quoted so far.
    pub fn quotes(&self) -> Vec<(Address, Address, TokenAmount)> {
        self.lock().quotes.clone()
    }
}

#[async_trait]
impl PriceFeed for MockFeed {
    async fn quote(
        &self,
        src: Address,
        dest: Address,
        amount: TokenAmount,
    ) -> Result<Rational, Error> {
        let mut state = self.lock();
        state.quotes.push((src, dest, amount));
        match state.rate {
            Some(rate) if !rate.is_zero() => Ok(rate),
            _ => Err(MathError::InvalidOraclePrice.into()),
        }
    }
}
