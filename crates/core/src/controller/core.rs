use std::future::Future;

use alloy::primitives::Address;
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::{
    access::{AccessControl, Role},
    buyback::{BuyBackDecision, plan_buy_back, remaining_buy_volume, remaining_sell_volume},
    claims::{ClaimCursor, pending_claims},
    controller::{
        ClaimOutcome, ClaimStatus, CycleAction, CycleReport, Decision, RunSummary, StatusReport,
        decide,
    },
    error::{ConfigError, Error, ErrorKind, StateError, TransactionError, ValidationError},
    planner::{TriggerPlan, plan_trigger},
    schedule::TickStream,
    types::{
        action::{BalanceReceipt, ClaimCommand, ClaimSide, TransferReceipt},
        config::{AgentConfig, CycleSettings},
        primitives::TokenAmount,
        snapshot::{AuctionSnapshot, RoundMarker},
        state::ParticipationState,
    },
    validation::{self, FundingSource},
    views::{Exchange, PriceFeed},
};

pub struct Controller<X, F>
where
    X: Exchange,
    F: PriceFeed,
{
    exchange: X,
    feed: F,
    config: AgentConfig,
    access: AccessControl,
    settings: CycleSettings,
    cursor: ClaimCursor,
    summary: RunSummary,
}

impl<X, F> Controller<X, F>
where
    X: Exchange,
    F: PriceFeed,
{
    pub fn new(
        config: AgentConfig,
        access: AccessControl,
        settings: CycleSettings,
        exchange: X,
        feed: F,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            exchange,
            feed,
            config,
            access,
            settings,
            cursor: ClaimCursor::new(settings.claim_cursor_start),
            summary: RunSummary::default(),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn cursor(&self) -> ClaimCursor {
        self.cursor
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn exchange(&self) -> &X {
        &self.exchange
    }

    /// Polls until `ticks` ends or a failure the next cycle cannot fix.
    pub async fn run<T>(&mut self, caller: Address, mut ticks: T) -> Result<RunSummary, Error>
    where
        T: TickStream,
    {
        self.access.require(caller, Role::Operator)?;

        while ticks.next().await.is_some() {
            match self.run_cycle(caller).await {
                Ok(_) => continue,
                Err(err) if err.is_transient() => continue,
                Err(err) => {
                    error!(
                        kind = %err.kind(),
                        error = %err,
                        cycles = self.summary.cycles,
                        "stopping agent"
                    );
                    return Err(err);
                }
            }
        }

        info!(
            cycles = self.summary.cycles,
            failed = self.summary.failed_cycles,
            claims = self.summary.claims,
            triggers = self.summary.triggers,
            buy_backs = self.summary.buy_backs,
            "tick stream ended"
        );
        Ok(self.summary)
    }

    pub async fn run_cycle(&mut self, caller: Address) -> Result<CycleReport, Error> {
        self.access.require(caller, Role::Operator)?;

        let result = self.execute_cycle().await;
        self.record_result(&result);
        result
    }

    fn record_result(&mut self, result: &Result<CycleReport, Error>) {
        self.summary.cycles += 1;
        match result {
            Ok(report) => {
                self.summary.claims += report.claimed_count();
                match report.action {
                    CycleAction::Triggered { .. } => self.summary.triggers += 1,
                    CycleAction::BoughtBack { .. } => self.summary.buy_backs += 1,
                    CycleAction::Idle { .. }
                    | CycleAction::Waiting { .. }
                    | CycleAction::Held { .. } => {}
                }
                info!(
                    block = report.block_number,
                    state = report.state.as_str(),
                    action = report.action.as_str(),
                    claims = report.claims.len(),
                    "cycle complete"
                );
            }
            Err(err) => {
                self.summary.failed_cycles += 1;
                match err.kind() {
                    ErrorKind::InvalidOraclePrice | ErrorKind::Arithmetic => {
                        error!(kind = %err.kind(), error = %err, "cycle aborted on price data")
                    }
                    _ => warn!(kind = %err.kind(), error = %err, "cycle aborted"),
                }
            }
        }
    }

    async fn execute_cycle(&mut self) -> Result<CycleReport, Error> {
        let snapshot = self
            .read(
                "snapshot",
                self.exchange
                    .fetch_snapshot(&self.cursor, self.settings.claim_scan_limit),
            )
            .await?;

        let claims = self.settle_claims(&snapshot).await?;

        let state = ParticipationState::classify(&snapshot);
        let action = match decide(&snapshot)? {
            Decision::Idle { threshold } => {
                debug!(%threshold, volume = %snapshot.sell_volume, "threshold already met");
                CycleAction::Idle { threshold }
            }
            Decision::Trigger(plan) => self.trigger(&snapshot, plan).await?,
            Decision::Wait { starts_at } => {
                info!(%starts_at, now = %snapshot.current_time, "round scheduled, waiting");
                CycleAction::Waiting { starts_at }
            }
            Decision::EvaluateBuyBack => self.evaluate_buy_back(&snapshot).await?,
        };

        Ok(CycleReport {
            block_number: snapshot.block_number,
            state,
            claims,
            action,
        })
    }

    async fn settle_claims(&mut self, snapshot: &AuctionSnapshot) -> Result<Vec<ClaimOutcome>, Error> {
        let commands = pending_claims(snapshot, &self.cursor);
        let mut outcomes = Vec::with_capacity(commands.len());
        for command in commands {
            outcomes.push(self.claim(snapshot, command).await?);
        }

        let settled = outcomes
            .iter()
            .all(|outcome| matches!(outcome.status, ClaimStatus::Claimed { .. }));
        if settled {
            self.cursor.advance(snapshot);
        }
        Ok(outcomes)
    }

    async fn claim(
        &self,
        snapshot: &AuctionSnapshot,
        command: ClaimCommand,
    ) -> Result<ClaimOutcome, Error> {
        let result = match command.side {
            ClaimSide::Seller => {
                self.exchange
                    .claim_seller_funds(command.pair, command.holder, command.round)
                    .await
            }
            ClaimSide::Buyer => {
                self.exchange
                    .claim_buyer_funds(command.pair, command.holder, command.round)
                    .await
            }
        };

        match result {
            Ok(receipt) => {
                info!(
                    direction = ?command.direction,
                    round = %command.round,
                    side = ?command.side,
                    returned = %receipt.returned,
                    tx_hash = %receipt.tx_hash,
                    "claimed"
                );
                Ok(ClaimOutcome {
                    command,
                    returned: receipt.returned,
                    status: ClaimStatus::Claimed {
                        tx_hash: receipt.tx_hash,
                    },
                })
            }
            Err(err @ Error::Transaction(_)) => {
                let closing = self
                    .read(
                        "closing price",
                        self.exchange.closing_price(command.pair, command.round),
                    )
                    .await;
                if let Ok(None) = closing {
                    let reason = ValidationError::RoundNotYetClosed {
                        round: command.round,
                    };
                    warn!(direction = ?command.direction, %reason, "claim deferred");
                    return Ok(ClaimOutcome {
                        command,
                        returned: TokenAmount::ZERO,
                        status: ClaimStatus::RoundNotYetClosed,
                    });
                }
                Err(self.check_stale(snapshot.marker(), err).await)
            }
            Err(err) => Err(err),
        }
    }

    async fn trigger(
        &self,
        snapshot: &AuctionSnapshot,
        plan: TriggerPlan,
    ) -> Result<CycleAction, Error> {
        let funding =
            validation::choose_sell_funding(self.config.token, &snapshot.balances, plan.gross)?;

        info!(
            threshold = %plan.threshold,
            missing = %plan.missing,
            gross = %plan.gross,
            ?funding,
            "triggering round"
        );

        let result = match funding {
            FundingSource::ExchangeBalance => {
                self.exchange
                    .post_sell_order(snapshot.pair, snapshot.auction_index, plan.gross)
                    .await
            }
            FundingSource::Custody => {
                self.exchange
                    .deposit_and_sell(snapshot.pair, plan.gross)
                    .await
            }
        };

        match result {
            Ok(receipt) => Ok(CycleAction::Triggered {
                plan,
                funding,
                receipt,
            }),
            Err(err) => Err(self.check_stale(snapshot.marker(), err).await),
        }
    }

    async fn evaluate_buy_back(&self, snapshot: &AuctionSnapshot) -> Result<CycleAction, Error> {
        let Some(price) = snapshot.current_price else {
            debug!(round = %snapshot.auction_index, "no auction price yet");
            return Ok(CycleAction::Held {
                price: None,
                reference: None,
            });
        };

        let quote_size = remaining_sell_volume(snapshot.sell_volume, snapshot.buy_volume, &price)?;
        let reference = self
            .read(
                "reference quote",
                self.feed
                    .quote(self.config.token, self.config.numeraire, quote_size),
            )
            .await?;

        let plan = match plan_buy_back(snapshot, price, reference)? {
            BuyBackDecision::Buy(plan) => plan,
            BuyBackDecision::Hold { price, reference } => {
                info!(%price, %reference, "auction above reference, holding");
                return Ok(CycleAction::Held {
                    price: Some(price),
                    reference: Some(reference),
                });
            }
            BuyBackDecision::NothingOutstanding => {
                debug!(round = %snapshot.auction_index, "round already bought out");
                return Ok(CycleAction::Held {
                    price: Some(price),
                    reference: Some(reference),
                });
            }
        };

        validation::validate_buy_back(self.config.numeraire, &snapshot.balances, plan.gross)?;

        info!(
            round = %plan.round,
            %price,
            %reference,
            remaining = %plan.remaining_buy,
            gross = %plan.gross,
            "buying back"
        );

        match self
            .exchange
            .post_buy_order(snapshot.pair, plan.round, plan.gross)
            .await
        {
            Ok(receipt) => Ok(CycleAction::BoughtBack { plan, receipt }),
            Err(err) => Err(self.check_stale(snapshot.marker(), err).await),
        }
    }

    /// Re-reads the round marker after a rejection. A moved round means the
    /// snapshot went stale under the command.
    async fn check_stale(&self, expected: RoundMarker, err: Error) -> Error {
        if !matches!(err, Error::Transaction(_)) {
            return err;
        }
        match self.read("round marker", self.exchange.fetch_marker()).await {
            Ok(observed) if observed != expected => {
                TransactionError::StaleSnapshotRejected { expected, observed }.into()
            }
            Ok(_) => err,
            Err(read_err) => {
                debug!(error = %read_err, "could not re-read round marker");
                err
            }
        }
    }

    async fn read<T>(
        &self,
        what: &'static str,
        fut: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        let after = self.settings.read_timeout;
        match tokio::time::timeout(after, fut).await {
            Ok(result) => result,
            Err(_) => Err(StateError::Timeout { what, after }.into()),
        }
    }

    pub async fn inspect(&self) -> Result<StatusReport, Error> {
        let snapshot = self
            .read(
                "snapshot",
                self.exchange
                    .fetch_snapshot(&self.cursor, self.settings.claim_scan_limit),
            )
            .await?;

        let state = ParticipationState::classify(&snapshot);
        let trigger = plan_trigger(&snapshot)?;
        let (remaining_sell, remaining_buy) = match (state, snapshot.current_price) {
            (ParticipationState::AuctionInProgress, Some(price)) => (
                Some(remaining_sell_volume(
                    snapshot.sell_volume,
                    snapshot.buy_volume,
                    &price,
                )?),
                Some(remaining_buy_volume(
                    snapshot.sell_volume,
                    snapshot.buy_volume,
                    &price,
                )?),
            ),
            _ => (None, None),
        };

        Ok(StatusReport {
            block_number: snapshot.block_number,
            current_time: snapshot.current_time,
            marker: snapshot.marker(),
            state,
            trigger,
            sell_volume: snapshot.sell_volume,
            buy_volume: snapshot.buy_volume,
            current_price: snapshot.current_price,
            remaining_sell,
            remaining_buy,
            fee_ratio: snapshot.fee_ratio,
            balances: snapshot.balances,
            pending_claims: pending_claims(&snapshot, &self.cursor),
            cursor: self.cursor,
        })
    }

    /// Moves `amount` of `asset` from custody onto the exchange ledger.
    pub async fn deposit(
        &self,
        caller: Address,
        asset: Address,
        amount: TokenAmount,
    ) -> Result<BalanceReceipt, Error> {
        self.access.require(caller, Role::Admin)?;
        validation::validate_amount(amount)?;
        let available = self
            .read("custody balance", self.exchange.custody_balance(asset))
            .await?;
        validation::ensure_balance(asset, amount, available)?;

        let receipt = self.exchange.deposit(asset, amount).await?;
        info!(%asset, %amount, new_balance = %receipt.new_balance, "deposit confirmed");
        Ok(receipt)
    }

    pub async fn withdraw(
        &self,
        caller: Address,
        asset: Address,
        amount: TokenAmount,
    ) -> Result<BalanceReceipt, Error> {
        self.access.require(caller, Role::Admin)?;
        validation::validate_amount(amount)?;
        let available = self
            .read("exchange balance", self.exchange.exchange_balance(asset))
            .await?;
        validation::ensure_balance(asset, amount, available)?;

        let receipt = self.exchange.withdraw(asset, amount).await?;
        info!(%asset, %amount, new_balance = %receipt.new_balance, "withdrawal confirmed");
        Ok(receipt)
    }

    pub async fn withdraw_from_custody(
        &self,
        caller: Address,
        asset: Address,
        amount: TokenAmount,
        to: Address,
    ) -> Result<TransferReceipt, Error> {
        self.access.require(caller, Role::Admin)?;
        if to == Address::ZERO {
            return Err(ConfigError::MissingAddress { field: "recipient" }.into());
        }
        validation::validate_amount(amount)?;
        let available = self
            .read("custody balance", self.exchange.custody_balance(asset))
            .await?;
        validation::ensure_balance(asset, amount, available)?;

        self.exchange.transfer_from_custody(asset, amount, to).await
    }

    pub fn add_operator(&mut self, caller: Address, operator: Address) -> Result<bool, Error> {
        let added = self.access.add_operator(caller, operator)?;
        if added {
            info!(%operator, "operator added");
        }
        Ok(added)
    }

    pub fn remove_operator(&mut self, caller: Address, operator: Address) -> Result<bool, Error> {
        let removed = self.access.remove_operator(caller, operator)?;
        if removed {
            info!(%operator, "operator removed");
        }
        Ok(removed)
    }
}
