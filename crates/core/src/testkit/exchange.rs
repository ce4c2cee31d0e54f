use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::{
    claims::ClaimCursor,
    error::{Error, TransactionError},
    math::fee_of,
    planner::threshold_tokens,
    types::{
        action::{BalanceReceipt, BuyReceipt, ClaimReceipt, SellReceipt, TransferReceipt},
        config::AgentConfig,
        primitives::{AuctionIndex, Direction, Timestamp, TokenAmount, TokenPair},
        rational::Rational,
        snapshot::{
            AccountPosition, AssetBalances, AuctionSnapshot, Balances, RoundMarker, RoundRange,
        },
        state::AUCTION_START_WAITING_FOR_FUNDING,
    },
    views::{Custody, ExchangeCommands, ExchangeView},
};

/// Seconds between reaching the threshold and the round opening.
pub const ROUND_START_DELAY: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Deposit,
    Withdraw,
    DepositAndSell,
    PostSellOrder,
    PostBuyOrder,
    ClaimSellerFunds,
    ClaimBuyerFunds,
    TransferFromCustody,
}

/// A command that reached the exchange, whether or not it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedCommand {
    pub kind: CommandKind,
    pub round: Option<AuctionIndex>,
    pub amount: TokenAmount,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Plain revert; exchange state is untouched.
    Revert,
    /// Someone else cleared the round just before the command landed.
    RoundMoved,
}

#[derive(Debug, Clone, Copy, Default)]
struct RoundBook {
    sell_volume: U256,
    buy_volume: U256,
    seller_balance: U256,
    buyer_balance: U256,
    closing: Option<Rational>,
}

#[derive(Debug)]
struct MockState {
    config: AgentConfig,
    holder: Address,
    now: u64,
    block: u64,
    usd_threshold: U256,
    oracle_usd: U256,
    fee_ratio: Rational,
    last_price: Option<Rational>,
    auction_index: u64,
    auction_start: u64,
    current_price: Option<Rational>,
    rounds: BTreeMap<(u8, u64), RoundBook>,
    exchange: HashMap<Address, U256>,
    custody: HashMap<Address, U256>,
    log: Vec<IssuedCommand>,
    rejections: VecDeque<(CommandKind, Rejection)>,
    read_delay: Option<Duration>,
    snapshot_failure: Option<Error>,
    reopen_after_snapshot: Option<(Direction, u64)>,
    snapshots: u64,
    tx_counter: u64,
}

fn direction_key(direction: Direction) -> u8 {
    match direction {
        Direction::Forward => 0,
        Direction::Reverse => 1,
    }
}

fn reverted() -> Error {
    TransactionError::Reverted {
        tx_hash: B256::ZERO,
    }
    .into()
}

impl MockState {
    fn book(&mut self, direction: Direction, round: u64) -> &mut RoundBook {
        self.rounds
            .entry((direction_key(direction), round))
            .or_default()
    }

    fn peek_book(&self, direction: Direction, round: u64) -> RoundBook {
        self.rounds
            .get(&(direction_key(direction), round))
            .copied()
            .unwrap_or_default()
    }

    fn direction_of(&self, pair: TokenPair) -> Option<Direction> {
        let forward = self.config.pair(Direction::Forward);
        if pair == forward {
            Some(Direction::Forward)
        } else if pair == forward.reversed() {
            Some(Direction::Reverse)
        } else {
            None
        }
    }

    fn balance(map: &HashMap<Address, U256>, asset: Address) -> U256 {
        map.get(&asset).copied().unwrap_or_default()
    }

    fn credit(map: &mut HashMap<Address, U256>, asset: Address, amount: U256) {
        *map.entry(asset).or_default() += amount;
    }

    fn debit(map: &mut HashMap<Address, U256>, asset: Address, amount: U256) -> Result<(), Error> {
        let balance = map.entry(asset).or_default();
        if *balance < amount {
            return Err(reverted());
        }
        *balance -= amount;
        Ok(())
    }

    fn next_tx(&mut self) -> B256 {
        self.tx_counter += 1;
        self.block += 1;
        B256::left_padding_from(&self.tx_counter.to_be_bytes())
    }

    /// Consumes a scripted rejection for `kind`, applying its side effect.
    fn take_rejection(&mut self, kind: CommandKind) -> Result<(), Error> {
        let Some(position) = self.rejections.iter().position(|(k, _)| *k == kind) else {
            return Ok(());
        };
        let rejection = self.rejections.remove(position).map(|(_, r)| r);
        if rejection == Some(Rejection::RoundMoved) {
            self.auction_index += 1;
            self.auction_start = AUCTION_START_WAITING_FOR_FUNDING;
            self.current_price = None;
        }
        Err(reverted())
    }

    fn record(&mut self, kind: CommandKind, round: Option<AuctionIndex>, amount: U256, ok: bool) {
        self.log.push(IssuedCommand {
            kind,
            round,
            amount: TokenAmount::new(amount),
            succeeded: ok,
        });
    }

    fn sell_into_current(&mut self, gross: U256) -> Result<U256, Error> {
        let net = gross - fee_of(gross, &self.fee_ratio)?;
        let round = self.auction_index;
        let book = self.book(Direction::Forward, round);
        book.sell_volume += net;
        book.seller_balance += net;
        self.schedule_if_funded();
        Ok(net)
    }

    /// Schedules the round once its volume is worth the threshold. An
    /// unusable oracle or last price leaves it unscheduled.
    fn schedule_if_funded(&mut self) {
        if self.auction_start > AUCTION_START_WAITING_FOR_FUNDING {
            return;
        }
        let Ok(threshold) =
            threshold_tokens(self.usd_threshold, self.oracle_usd, self.last_price.as_ref())
        else {
            return;
        };
        let volume = self.peek_book(Direction::Forward, self.auction_index).sell_volume;
        if volume >= threshold.as_u256() {
            self.auction_start = self.now + ROUND_START_DELAY;
        }
    }

    fn clear_round(&mut self, price: Rational) {
        let round = self.auction_index;
        self.book(Direction::Forward, round).closing = Some(price);
        let reverse = self.book(Direction::Reverse, round);
        if !reverse.sell_volume.is_zero() {
            reverse.closing = price.inverse().ok();
        }
        self.last_price = Some(price);
        self.auction_index += 1;
        self.auction_start = AUCTION_START_WAITING_FOR_FUNDING;
        self.current_price = None;
    }

    fn is_running(&self) -> bool {
        self.auction_start > AUCTION_START_WAITING_FOR_FUNDING && self.now >= self.auction_start
    }

    fn post_sell(&mut self, pair: TokenPair, round: AuctionIndex, amount: U256) -> Result<SellReceipt, Error> {
        self.take_rejection(CommandKind::PostSellOrder)?;
        if self.direction_of(pair) != Some(Direction::Forward)
            || round.as_u64() != self.auction_index
            || self.auction_start > AUCTION_START_WAITING_FOR_FUNDING
            || amount.is_zero()
        {
            return Err(reverted());
        }
        fee_of(amount, &self.fee_ratio)?;
        Self::debit(&mut self.exchange, pair.sell_token, amount)?;
        let net = self.sell_into_current(amount)?;
        Ok(SellReceipt {
            tx_hash: self.next_tx(),
            auction_index: round,
            amount: TokenAmount::new(net),
        })
    }

    fn deposit_and_sell(&mut self, pair: TokenPair, amount: U256) -> Result<SellReceipt, Error> {
        self.take_rejection(CommandKind::DepositAndSell)?;
        if self.direction_of(pair) != Some(Direction::Forward)
            || self.auction_start > AUCTION_START_WAITING_FOR_FUNDING
            || amount.is_zero()
        {
            return Err(reverted());
        }
        fee_of(amount, &self.fee_ratio)?;
        Self::debit(&mut self.custody, pair.sell_token, amount)?;
        let round = AuctionIndex::new(self.auction_index);
        let net = self.sell_into_current(amount)?;
        Ok(SellReceipt {
            tx_hash: self.next_tx(),
            auction_index: round,
            amount: TokenAmount::new(net),
        })
    }

    fn post_buy(&mut self, pair: TokenPair, round: AuctionIndex, amount: U256) -> Result<BuyReceipt, Error> {
        self.take_rejection(CommandKind::PostBuyOrder)?;
        if self.direction_of(pair) != Some(Direction::Forward)
            || round.as_u64() != self.auction_index
            || !self.is_running()
        {
            return Err(reverted());
        }
        let price = self.current_price.ok_or_else(reverted)?;
        let book = self.peek_book(Direction::Forward, self.auction_index);
        let outstanding = price
            .mul_floor(book.sell_volume)?
            .saturating_sub(book.buy_volume);

        // orders covering the outstanding volume are capped and pay no fee
        let (taken, net, clears) = if amount >= outstanding {
            (outstanding, outstanding, true)
        } else {
            (amount, amount - fee_of(amount, &self.fee_ratio)?, false)
        };
        Self::debit(&mut self.exchange, pair.buy_token, taken)?;

        let index = self.auction_index;
        let book = self.book(Direction::Forward, index);
        book.buy_volume += net;
        book.buyer_balance += net;
        if clears {
            self.clear_round(price);
        }
        Ok(BuyReceipt {
            tx_hash: self.next_tx(),
            auction_index: round,
            amount: TokenAmount::new(net),
        })
    }

    fn claim(
        &mut self,
        kind: CommandKind,
        pair: TokenPair,
        holder: Address,
        round: AuctionIndex,
    ) -> Result<ClaimReceipt, Error> {
        self.take_rejection(kind)?;
        let direction = self.direction_of(pair).ok_or_else(reverted)?;
        if holder != self.holder {
            return Err(reverted());
        }
        let book = self.book(direction, round.as_u64());
        let closing = book.closing.ok_or_else(reverted)?;

        let (returned, paid_in) = match kind {
            CommandKind::ClaimSellerFunds => {
                let returned = closing.mul_floor(book.seller_balance)?;
                book.seller_balance = U256::ZERO;
                (returned, pair.buy_token)
            }
            _ => {
                let returned = if book.buyer_balance.is_zero() {
                    U256::ZERO
                } else {
                    closing.div_floor(book.buyer_balance)?
                };
                book.buyer_balance = U256::ZERO;
                (returned, pair.sell_token)
            }
        };
        Self::credit(&mut self.exchange, paid_in, returned);
        Ok(ClaimReceipt {
            tx_hash: self.next_tx(),
            returned: TokenAmount::new(returned),
            frts_issued: TokenAmount::ZERO,
        })
    }
}

/// Single-pair exchange simulation with one tracked holder. Clones share
/// state, so a test can keep a handle after moving one into a controller.
#[derive(Debug, Clone)]
pub struct MockExchange {
    state: Arc<Mutex<MockState>>,
}

impl MockExchange {
    /// Round 1 waiting for funding, last price 1/1, fee 1/201, a 1000 usd
    /// threshold and an oracle at 1 usd per numeraire.
    pub fn new(config: AgentConfig, holder: Address) -> Self {
        let state = MockState {
            config,
            holder,
            now: 10_000,
            block: 100,
            usd_threshold: U256::from(1000u64),
            oracle_usd: U256::from(1u64),
            fee_ratio: super::rational(1, 201),
            last_price: Some(super::rational(1, 1)),
            auction_index: 1,
            auction_start: AUCTION_START_WAITING_FOR_FUNDING,
            current_price: None,
            rounds: BTreeMap::new(),
            exchange: HashMap::new(),
            custody: HashMap::new(),
            log: Vec::new(),
            rejections: VecDeque::new(),
            read_delay: None,
            snapshot_failure: None,
            reopen_after_snapshot: None,
            snapshots: 0,
            tx_counter: 0,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run<T>(
        &self,
        kind: CommandKind,
        round: Option<AuctionIndex>,
        amount: TokenAmount,
        op: impl FnOnce(&mut MockState) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut state = self.lock();
        let result = op(&mut state);
        state.record(kind, round, amount.as_u256(), result.is_ok());
        result
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.lock().now)
    }

    pub fn advance_time(&self, secs: u64) {
        let mut state = self.lock();
        state.now += secs;
        state.block += 1;
    }

    pub fn set_threshold(&self, usd: U256) {
        self.lock().usd_threshold = usd;
    }

    pub fn set_oracle_price(&self, usd_per_numeraire: U256) {
        self.lock().oracle_usd = usd_per_numeraire;
    }

    pub fn set_last_price(&self, price: Option<Rational>) {
        self.lock().last_price = price;
    }

    pub fn set_fee_ratio(&self, fee_ratio: Rational) {
        self.lock().fee_ratio = fee_ratio;
    }

    pub fn set_current_price(&self, price: Rational) {
        self.lock().current_price = Some(price);
    }

    pub fn fund_custody(&self, asset: Address, amount: TokenAmount) {
        MockState::credit(&mut self.lock().custody, asset, amount.as_u256());
    }

    pub fn fund_exchange(&self, asset: Address, amount: TokenAmount) {
        MockState::credit(&mut self.lock().exchange, asset, amount.as_u256());
    }

    /// Another participant sells `gross` into the current forward round.
    pub fn external_sell(&self, gross: TokenAmount) -> Result<(), Error> {
        let mut state = self.lock();
        let net = gross.as_u256() - fee_of(gross.as_u256(), &state.fee_ratio)?;
        let round = state.auction_index;
        state.book(Direction::Forward, round).sell_volume += net;
        state.schedule_if_funded();
        Ok(())
    }

    /// Another participant buys out the current round at `price`.
    pub fn external_clear(&self, price: Rational) {
        let mut state = self.lock();
        state.clear_round(price);
    }

    /// Puts the holder in a past or current round directly.
    pub fn set_position(
        &self,
        direction: Direction,
        round: AuctionIndex,
        seller_balance: TokenAmount,
        buyer_balance: TokenAmount,
        closing: Option<Rational>,
    ) {
        let mut state = self.lock();
        let book = state.book(direction, round.as_u64());
        book.seller_balance = seller_balance.as_u256();
        book.buyer_balance = buyer_balance.as_u256();
        book.sell_volume = book.sell_volume.max(seller_balance.as_u256());
        book.closing = closing;
    }

    /// Jumps the pair to `index` with no round scheduled.
    pub fn set_auction_index(&self, index: AuctionIndex) {
        let mut state = self.lock();
        state.auction_index = index.as_u64();
        state.auction_start = AUCTION_START_WAITING_FOR_FUNDING;
    }

    pub fn reject_next(&self, kind: CommandKind, rejection: Rejection) {
        self.lock().rejections.push_back((kind, rejection));
    }

    /// Fails the next snapshot read with `err`.
    pub fn fail_next_snapshot(&self, err: impl Into<Error>) {
        self.lock().snapshot_failure = Some(err.into());
    }

    /// Drops the closing price of `round` right after the next snapshot is
    /// taken, so that snapshot still reports the round as closed.
    pub fn reopen_after_snapshot(&self, direction: Direction, round: AuctionIndex) {
        self.lock().reopen_after_snapshot = Some((direction, round.as_u64()));
    }

    /// Delays every snapshot read by `delay`.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.lock().read_delay = delay;
    }

    pub fn commands(&self) -> Vec<IssuedCommand> {
        self.lock().log.clone()
    }

    pub fn snapshots_taken(&self) -> u64 {
        self.lock().snapshots
    }

    pub fn marker(&self) -> RoundMarker {
        let state = self.lock();
        RoundMarker {
            auction_index: AuctionIndex::new(state.auction_index),
            auction_start: Timestamp::new(state.auction_start),
        }
    }

    pub fn exchange_balance_of(&self, asset: Address) -> TokenAmount {
        TokenAmount::new(MockState::balance(&self.lock().exchange, asset))
    }

    pub fn custody_balance_of(&self, asset: Address) -> TokenAmount {
        TokenAmount::new(MockState::balance(&self.lock().custody, asset))
    }

    pub fn sell_volume(&self) -> TokenAmount {
        let state = self.lock();
        TokenAmount::new(state.peek_book(Direction::Forward, state.auction_index).sell_volume)
    }

    pub fn position(&self, direction: Direction, round: AuctionIndex) -> (TokenAmount, TokenAmount) {
        let book = self.lock().peek_book(direction, round.as_u64());
        (
            TokenAmount::new(book.seller_balance),
            TokenAmount::new(book.buyer_balance),
        )
    }

    fn build_snapshot(&self, cursor: &ClaimCursor, scan_limit: u64) -> AuctionSnapshot {
        let mut state = self.lock();
        state.snapshots += 1;
        let index = AuctionIndex::new(state.auction_index);
        let window = cursor.window(index, index, scan_limit);
        let current = state.peek_book(Direction::Forward, state.auction_index);

        let mut positions = Vec::new();
        for (direction, range) in [
            (Direction::Forward, window.forward),
            (Direction::Reverse, window.reverse),
        ] {
            positions.extend(positions_in(&state, direction, range));
        }

        let holdings = |map: &HashMap<Address, U256>| AssetBalances {
            token: TokenAmount::new(MockState::balance(map, state.config.token)),
            numeraire: TokenAmount::new(MockState::balance(map, state.config.numeraire)),
        };

        AuctionSnapshot {
            block_number: state.block,
            current_time: Timestamp::new(state.now),
            holder: state.holder,
            pair: state.config.pair(Direction::Forward),
            auction_index: index,
            reverse_auction_index: index,
            auction_start: Timestamp::new(state.auction_start),
            sell_volume: TokenAmount::new(current.sell_volume),
            buy_volume: TokenAmount::new(current.buy_volume),
            current_price: state.current_price,
            usd_threshold: state.usd_threshold,
            oracle_usd_per_numeraire: state.oracle_usd,
            last_closing_price: state.last_price,
            fee_ratio: state.fee_ratio,
            balances: Balances {
                exchange: holdings(&state.exchange),
                custody: holdings(&state.custody),
            },
            claim_window: window,
            positions,
        }
    }
}

fn positions_in(state: &MockState, direction: Direction, range: RoundRange) -> Vec<AccountPosition> {
    range
        .rounds()
        .map(|round| {
            let book = state.peek_book(direction, round.as_u64());
            AccountPosition {
                direction,
                round,
                seller_balance: TokenAmount::new(book.seller_balance),
                buyer_balance: TokenAmount::new(book.buyer_balance),
                closing_price: book.closing,
            }
        })
        .collect()
}

#[async_trait]
impl ExchangeView for MockExchange {
    async fn fetch_snapshot(
        &self,
        cursor: &ClaimCursor,
        scan_limit: u64,
    ) -> Result<AuctionSnapshot, Error> {
        let delay = self.lock().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.lock().snapshot_failure.take() {
            return Err(err);
        }
        let snapshot = self.build_snapshot(cursor, scan_limit);
        let mut state = self.lock();
        if let Some((direction, round)) = state.reopen_after_snapshot.take() {
            state.book(direction, round).closing = None;
        }
        Ok(snapshot)
    }

    async fn fetch_marker(&self) -> Result<RoundMarker, Error> {
        Ok(self.marker())
    }

    async fn closing_price(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
    ) -> Result<Option<Rational>, Error> {
        let state = self.lock();
        let direction = state.direction_of(pair).ok_or_else(reverted)?;
        Ok(state.peek_book(direction, round.as_u64()).closing)
    }

    async fn exchange_balance(&self, asset: Address) -> Result<TokenAmount, Error> {
        Ok(self.exchange_balance_of(asset))
    }
}

#[async_trait]
impl ExchangeCommands for MockExchange {
    async fn deposit(&self, asset: Address, amount: TokenAmount) -> Result<BalanceReceipt, Error> {
        self.run(CommandKind::Deposit, None, amount, |state| {
            state.take_rejection(CommandKind::Deposit)?;
            MockState::debit(&mut state.custody, asset, amount.as_u256())?;
            MockState::credit(&mut state.exchange, asset, amount.as_u256());
            Ok(BalanceReceipt {
                tx_hash: state.next_tx(),
                new_balance: TokenAmount::new(MockState::balance(&state.exchange, asset)),
            })
        })
    }

    async fn withdraw(
        &self,
        asset: Address,
        amount: TokenAmount,
    ) -> Result<BalanceReceipt, Error> {
        self.run(CommandKind::Withdraw, None, amount, |state| {
            state.take_rejection(CommandKind::Withdraw)?;
            MockState::debit(&mut state.exchange, asset, amount.as_u256())?;
            MockState::credit(&mut state.custody, asset, amount.as_u256());
            Ok(BalanceReceipt {
                tx_hash: state.next_tx(),
                new_balance: TokenAmount::new(MockState::balance(&state.exchange, asset)),
            })
        })
    }

    async fn deposit_and_sell(
        &self,
        pair: TokenPair,
        amount: TokenAmount,
    ) -> Result<SellReceipt, Error> {
        self.run(CommandKind::DepositAndSell, None, amount, |state| {
            state.deposit_and_sell(pair, amount.as_u256())
        })
    }

    async fn post_sell_order(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
        amount: TokenAmount,
    ) -> Result<SellReceipt, Error> {
        self.run(CommandKind::PostSellOrder, Some(round), amount, |state| {
            state.post_sell(pair, round, amount.as_u256())
        })
    }

    async fn post_buy_order(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
        amount: TokenAmount,
    ) -> Result<BuyReceipt, Error> {
        self.run(CommandKind::PostBuyOrder, Some(round), amount, |state| {
            state.post_buy(pair, round, amount.as_u256())
        })
    }

    async fn claim_seller_funds(
        &self,
        pair: TokenPair,
        holder: Address,
        round: AuctionIndex,
    ) -> Result<ClaimReceipt, Error> {
        self.run(
            CommandKind::ClaimSellerFunds,
            Some(round),
            TokenAmount::ZERO,
            |state| state.claim(CommandKind::ClaimSellerFunds, pair, holder, round),
        )
    }

    async fn claim_buyer_funds(
        &self,
        pair: TokenPair,
        holder: Address,
        round: AuctionIndex,
    ) -> Result<ClaimReceipt, Error> {
        self.run(
            CommandKind::ClaimBuyerFunds,
            Some(round),
            TokenAmount::ZERO,
            |state| state.claim(CommandKind::ClaimBuyerFunds, pair, holder, round),
        )
    }
}

#[async_trait]
impl Custody for MockExchange {
    async fn custody_balance(&self, asset: Address) -> Result<TokenAmount, Error> {
        Ok(self.custody_balance_of(asset))
    }

    async fn transfer_from_custody(
        &self,
        asset: Address,
        amount: TokenAmount,
        _to: Address,
    ) -> Result<TransferReceipt, Error> {
        self.run(CommandKind::TransferFromCustody, None, amount, |state| {
            state.take_rejection(CommandKind::TransferFromCustody)?;
            MockState::debit(&mut state.custody, asset, amount.as_u256())?;
            Ok(TransferReceipt {
                tx_hash: state.next_tx(),
            })
        })
    }
}
