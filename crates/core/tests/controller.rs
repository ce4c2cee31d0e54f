use std::time::Duration;

use alloy::primitives::{Address, U256};
use dxmm_core::{
    AccessError, AgentConfig, AuctionIndex, ClaimStatus, ConfigError, Controller, CycleAction,
    CycleSettings, Direction, Error, ErrorKind, ParticipationState, Role, TokenAmount,
    ValidationError,
    testkit::{
        CommandKind, MockExchange, MockFeed, ROUND_START_DELAY, Rejection, access_control,
        admin_address, agent_config, holder_address, numeraire_address, operator_address,
        rational, token_address,
    },
    validation::FundingSource,
};
use futures::{StreamExt, stream};
use tokio::time::Instant;

struct Harness {
    controller: Controller<MockExchange, MockFeed>,
    exchange: MockExchange,
    feed: MockFeed,
}

fn harness_with(settings: CycleSettings) -> Harness {
    let exchange = MockExchange::new(agent_config(), holder_address());
    let feed = MockFeed::with_rate(rational(1, 1));
    let controller = Controller::new(
        agent_config(),
        access_control(),
        settings,
        exchange.clone(),
        feed.clone(),
    )
    .expect("valid controller");
    Harness {
        controller,
        exchange,
        feed,
    }
}

fn harness() -> Harness {
    harness_with(CycleSettings::default())
}

fn amount(value: u64) -> TokenAmount {
    TokenAmount::from(value)
}

fn claim_commands(exchange: &MockExchange) -> usize {
    exchange
        .commands()
        .iter()
        .filter(|c| {
            matches!(
                c.kind,
                CommandKind::ClaimSellerFunds | CommandKind::ClaimBuyerFunds
            )
        })
        .count()
}

#[tokio::test]
async fn trigger_funds_missing_volume_from_custody() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert_eq!(report.state, ParticipationState::NoAuctionTriggered);
    let CycleAction::Triggered {
        plan,
        funding,
        receipt,
    } = report.action
    else {
        panic!("expected a trigger, got {:?}", report.action);
    };
    assert_eq!(plan.threshold, amount(1_000));
    assert_eq!(plan.missing, amount(1_000));
    assert_eq!(plan.gross, amount(1_005));
    assert_eq!(funding, FundingSource::Custody);
    assert_eq!(receipt.amount, amount(1_000));

    assert_eq!(h.exchange.custody_balance_of(token_address()), amount(3_995));
    let marker = h.exchange.marker();
    assert_eq!(
        marker.auction_start,
        h.exchange.now().plus_secs(ROUND_START_DELAY)
    );

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert_eq!(
        report.action,
        CycleAction::Waiting {
            starts_at: marker.auction_start
        }
    );
    assert_eq!(h.controller.summary().triggers, 1);
}

#[tokio::test]
async fn trigger_prefers_exchange_balance() {
    let mut h = harness();
    h.exchange.fund_exchange(token_address(), amount(2_000));
    h.exchange.fund_custody(token_address(), amount(2_000));

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert!(matches!(
        report.action,
        CycleAction::Triggered {
            funding: FundingSource::ExchangeBalance,
            ..
        }
    ));
    assert_eq!(h.exchange.exchange_balance_of(token_address()), amount(995));
    assert_eq!(h.exchange.custody_balance_of(token_address()), amount(2_000));
}

#[tokio::test]
async fn trigger_without_funds_is_insufficient_balance() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(10));

    let err = h.controller.run_cycle(operator_address()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InsufficientBalance { .. })
    ));
    assert!(err.is_transient());
    assert!(h.exchange.commands().is_empty());
    assert_eq!(h.controller.summary().failed_cycles, 1);
}

#[tokio::test]
async fn other_sellers_reduce_what_is_missing() {
    let h = harness();
    h.exchange.set_threshold(U256::from(25_000u64));
    // add_fee(10000) at 1/201 is 10050; the round keeps 10000
    h.exchange.external_sell(amount(10_050)).unwrap();
    assert_eq!(h.exchange.sell_volume(), amount(10_000));

    let status = h.controller.inspect().await.unwrap();
    assert_eq!(status.state, ParticipationState::NoAuctionTriggered);
    assert_eq!(status.trigger.threshold, amount(25_000));
    assert_eq!(status.trigger.missing, amount(15_000));
}

#[tokio::test]
async fn buys_back_when_auction_is_cheaper_and_round_rolls_over() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange.fund_exchange(numeraire_address(), amount(1_000));
    h.controller.run_cycle(operator_address()).await.unwrap();

    h.exchange.advance_time(ROUND_START_DELAY);
    h.exchange.set_current_price(rational(1, 2));
    h.feed.set_rate(rational(1, 1));

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert_eq!(report.state, ParticipationState::AuctionInProgress);
    let CycleAction::BoughtBack { plan, receipt } = report.action else {
        panic!("expected a buy-back, got {:?}", report.action);
    };
    assert_eq!(plan.remaining_buy, amount(500));
    assert_eq!(plan.gross, amount(503));
    assert_eq!(receipt.amount, amount(500));
    // the exchange caps the order at the outstanding volume
    assert_eq!(
        h.exchange.exchange_balance_of(numeraire_address()),
        amount(500)
    );

    let quotes = h.feed.quotes();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0], (token_address(), numeraire_address(), amount(1_000)));

    let status = h.controller.inspect().await.unwrap();
    assert_eq!(status.state, ParticipationState::NoAuctionTriggered);
    assert_eq!(status.marker.auction_index, AuctionIndex::new(2));
    assert_eq!(status.pending_claims.len(), 2);
    assert_eq!(h.controller.summary().buy_backs, 1);
}

#[tokio::test]
async fn equal_prices_buy_back() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange.fund_exchange(numeraire_address(), amount(1_000));
    h.controller.run_cycle(operator_address()).await.unwrap();

    h.exchange.advance_time(ROUND_START_DELAY);
    h.exchange.set_current_price(rational(1, 2));
    h.feed.set_rate(rational(2, 4));

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert!(matches!(report.action, CycleAction::BoughtBack { .. }));
}

#[tokio::test]
async fn holds_when_auction_is_more_expensive() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange.fund_exchange(numeraire_address(), amount(1_000));
    h.controller.run_cycle(operator_address()).await.unwrap();

    h.exchange.advance_time(ROUND_START_DELAY);
    h.exchange.set_current_price(rational(1, 2));
    h.feed.set_rate(rational(1, 3));

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert_eq!(
        report.action,
        CycleAction::Held {
            price: Some(rational(1, 2)),
            reference: Some(rational(1, 3)),
        }
    );
    assert!(
        h.exchange
            .commands()
            .iter()
            .all(|c| c.kind != CommandKind::PostBuyOrder)
    );
}

#[tokio::test]
async fn buy_back_needs_exchange_numeraire() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.controller.run_cycle(operator_address()).await.unwrap();

    h.exchange.advance_time(ROUND_START_DELAY);
    h.exchange.set_current_price(rational(1, 2));

    let err = h.controller.run_cycle(operator_address()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
}

#[tokio::test]
async fn claims_every_unclaimed_round_once() {
    let mut h = harness();
    h.exchange.set_auction_index(AuctionIndex::new(6));
    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(1),
        amount(100),
        amount(0),
        Some(rational(1, 1)),
    );
    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(2),
        amount(0),
        amount(0),
        Some(rational(1, 1)),
    );
    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(3),
        amount(0),
        amount(50),
        Some(rational(2, 1)),
    );
    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(4),
        amount(10),
        amount(0),
        None,
    );
    h.exchange.set_position(
        Direction::Reverse,
        AuctionIndex::new(2),
        amount(30),
        amount(0),
        Some(rational(1, 1)),
    );
    // enough outside volume that the cycle only waits after claiming
    h.exchange.external_sell(amount(2_000)).unwrap();

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert!(matches!(report.action, CycleAction::Waiting { .. }));
    let claimed: Vec<_> = report
        .claims
        .iter()
        .map(|o| (o.command.direction, o.command.round.as_u64(), o.returned))
        .collect();
    assert_eq!(
        claimed,
        vec![
            (Direction::Forward, 1, amount(100)),
            (Direction::Forward, 3, amount(25)),
            (Direction::Reverse, 2, amount(30)),
        ]
    );
    assert_eq!(
        h.exchange.exchange_balance_of(numeraire_address()),
        amount(100)
    );
    assert_eq!(h.exchange.exchange_balance_of(token_address()), amount(55));

    // round 4 is still open, so the forward cursor stops before it
    assert_eq!(h.controller.cursor().forward, AuctionIndex::new(3));
    assert_eq!(h.controller.cursor().reverse, AuctionIndex::new(5));

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert!(report.claims.is_empty());
    assert_eq!(claim_commands(&h.exchange), 3);

    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(4),
        amount(10),
        amount(0),
        Some(rational(1, 1)),
    );
    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert_eq!(report.claims.len(), 1);
    assert_eq!(report.claims[0].command.round, AuctionIndex::new(4));
    assert_eq!(h.controller.cursor().forward, AuctionIndex::new(5));
    assert_eq!(h.controller.summary().claims, 4);
}

#[tokio::test]
async fn rejected_claim_on_closed_round_aborts_the_cycle() {
    let mut h = harness();
    h.exchange.set_auction_index(AuctionIndex::new(3));
    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(1),
        amount(100),
        amount(0),
        Some(rational(1, 1)),
    );
    h.exchange
        .reject_next(CommandKind::ClaimSellerFunds, Rejection::Revert);

    let err = h.controller.run_cycle(operator_address()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(h.controller.cursor().forward, AuctionIndex::ZERO);

    // the next cycle picks the claim up again
    h.exchange.external_sell(amount(2_000)).unwrap();
    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert_eq!(report.claims.len(), 1);
    assert!(matches!(report.claims[0].status, ClaimStatus::Claimed { .. }));
}

#[tokio::test]
async fn claim_on_round_not_yet_closed_is_deferred() {
    let mut h = harness();
    h.exchange.set_auction_index(AuctionIndex::new(3));
    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(1),
        amount(100),
        amount(0),
        Some(rational(1, 1)),
    );
    h.exchange
        .reopen_after_snapshot(Direction::Forward, AuctionIndex::new(1));
    h.exchange.external_sell(amount(2_000)).unwrap();

    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert_eq!(report.claims.len(), 1);
    assert_eq!(report.claims[0].status, ClaimStatus::RoundNotYetClosed);
    assert_eq!(report.claims[0].returned, TokenAmount::ZERO);
    assert_eq!(report.claimed_count(), 0);
    assert!(matches!(report.action, CycleAction::Waiting { .. }));
    assert_eq!(h.controller.cursor().forward, AuctionIndex::ZERO);
    assert_eq!(h.controller.cursor().reverse, AuctionIndex::ZERO);
    assert_eq!(
        h.exchange.position(Direction::Forward, AuctionIndex::new(1)),
        (amount(100), amount(0))
    );

    // once the round closes for real the claim goes through
    h.exchange.set_position(
        Direction::Forward,
        AuctionIndex::new(1),
        amount(100),
        amount(0),
        Some(rational(1, 1)),
    );
    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    assert!(matches!(report.claims[0].status, ClaimStatus::Claimed { .. }));
    assert_eq!(h.controller.cursor().forward, AuctionIndex::new(2));
}

#[tokio::test]
async fn rejection_after_round_moved_is_stale() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange
        .reject_next(CommandKind::DepositAndSell, Rejection::RoundMoved);

    let err = h.controller.run_cycle(operator_address()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StaleSnapshotRejected);
    assert!(err.is_transient());
    assert_eq!(h.exchange.custody_balance_of(token_address()), amount(5_000));

    // the fresh snapshot sees round 2 and triggers it
    let report = h.controller.run_cycle(operator_address()).await.unwrap();
    let CycleAction::Triggered { receipt, .. } = report.action else {
        panic!("expected a trigger, got {:?}", report.action);
    };
    assert_eq!(receipt.auction_index, AuctionIndex::new(2));
}

#[tokio::test]
async fn plain_rejection_propagates_unchanged() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange
        .reject_next(CommandKind::DepositAndSell, Rejection::Revert);

    let err = h.controller.run_cycle(operator_address()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
}

#[tokio::test(start_paused = true)]
async fn slow_reads_time_out_before_any_command() {
    let mut h = harness_with(CycleSettings {
        read_timeout: Duration::from_secs(5),
        ..CycleSettings::default()
    });
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange.set_read_delay(Some(Duration::from_secs(60)));

    let err = h.controller.run_cycle(operator_address()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(h.exchange.commands().is_empty());
}

#[tokio::test]
async fn zero_oracle_price_fails_fast() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange.set_oracle_price(U256::ZERO);

    let err = h.controller.run_cycle(operator_address()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOraclePrice);
    assert!(err.is_transient());
    assert!(h.exchange.commands().is_empty());
}

#[tokio::test]
async fn unauthorized_callers_change_nothing() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(500));

    let err = h.controller.run_cycle(admin_address()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Access(AccessError::Unauthorized {
            role: Role::Operator,
            ..
        })
    ));
    assert_eq!(h.exchange.snapshots_taken(), 0);

    let err = h
        .controller
        .deposit(operator_address(), token_address(), amount(100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(
        h.controller
            .add_operator(operator_address(), Address::repeat_byte(0x77))
            .is_err()
    );

    assert!(h.exchange.commands().is_empty());
    assert_eq!(h.exchange.custody_balance_of(token_address()), amount(500));
    assert_eq!(h.exchange.exchange_balance_of(token_address()), amount(0));
}

#[tokio::test]
async fn admin_moves_funds() {
    let h = harness();
    let admin = admin_address();
    let token = token_address();
    h.exchange.fund_custody(token, amount(500));

    let receipt = h.controller.deposit(admin, token, amount(200)).await.unwrap();
    assert_eq!(receipt.new_balance, amount(200));
    assert_eq!(h.exchange.custody_balance_of(token), amount(300));

    let receipt = h.controller.withdraw(admin, token, amount(50)).await.unwrap();
    assert_eq!(receipt.new_balance, amount(150));
    assert_eq!(h.exchange.custody_balance_of(token), amount(350));

    let recipient = Address::repeat_byte(0x55);
    h.controller
        .withdraw_from_custody(admin, token, amount(100), recipient)
        .await
        .unwrap();
    assert_eq!(h.exchange.custody_balance_of(token), amount(250));
    assert_eq!(h.exchange.commands().len(), 3);
}

#[tokio::test]
async fn admin_fund_moves_are_validated_first() {
    let h = harness();
    let admin = admin_address();
    let token = token_address();
    h.exchange.fund_custody(token, amount(100));

    let err = h.controller.withdraw(admin, token, amount(1)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InsufficientBalance { .. })
    ));
    let err = h.controller.deposit(admin, token, amount(0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    let err = h
        .controller
        .withdraw_from_custody(admin, token, amount(10), Address::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::MissingAddress { field: "recipient" })
    ));

    assert!(h.exchange.commands().is_empty());
}

#[tokio::test]
async fn admin_manages_operators() {
    let mut h = harness();
    let newcomer = Address::repeat_byte(0x77);
    h.exchange.external_sell(amount(2_000)).unwrap();

    assert!(h.controller.run_cycle(newcomer).await.is_err());
    assert!(h.controller.add_operator(admin_address(), newcomer).unwrap());
    assert!(h.controller.run_cycle(newcomer).await.is_ok());
    assert!(h.controller.remove_operator(admin_address(), newcomer).unwrap());
    assert!(h.controller.run_cycle(newcomer).await.is_err());
}

#[test]
fn construction_rejects_zero_addresses() {
    let config = AgentConfig {
        token: Address::ZERO,
        ..agent_config()
    };
    let exchange = MockExchange::new(agent_config(), holder_address());
    let result = Controller::new(
        config,
        access_control(),
        CycleSettings::default(),
        exchange,
        MockFeed::default(),
    );
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::MissingAddress { field: "token" }))
    ));
}

#[tokio::test]
async fn run_continues_through_transient_failures() {
    let mut h = harness();
    let ticks = stream::iter(vec![Instant::now(); 3]);

    // no funds: every cycle fails with an insufficient balance
    let summary = h.controller.run(operator_address(), ticks).await.unwrap();
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.failed_cycles, 3);
}

#[tokio::test]
async fn run_recovers_after_a_bad_oracle_reading() {
    let mut h = harness();
    h.exchange.fund_custody(token_address(), amount(5_000));
    h.exchange.set_oracle_price(U256::ZERO);
    let exchange = h.exchange.clone();
    let ticks = stream::iter(0..3).map(move |tick| {
        if tick == 1 {
            exchange.set_oracle_price(U256::from(1u64));
        }
        Instant::now()
    });

    let summary = h.controller.run(operator_address(), ticks).await.unwrap();
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.failed_cycles, 1);
    assert_eq!(summary.triggers, 1);
}

#[tokio::test]
async fn run_continues_without_a_last_price() {
    let mut h = harness();
    h.exchange.set_last_price(None);
    let ticks = stream::iter(vec![Instant::now(); 3]);

    let summary = h.controller.run(operator_address(), ticks).await.unwrap();
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.failed_cycles, 3);
    assert!(h.exchange.commands().is_empty());
}

#[tokio::test]
async fn run_stops_on_misconfiguration() {
    let mut h = harness();
    h.exchange
        .fail_next_snapshot(ConfigError::MissingAddress { field: "price_feed" });
    let ticks = stream::iter(vec![Instant::now(); 3]);

    let err = h.controller.run(operator_address(), ticks).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Misconfigured);
    assert_eq!(h.controller.summary().cycles, 1);
}

#[tokio::test]
async fn run_requires_operator() {
    let mut h = harness();
    let ticks = stream::iter(vec![Instant::now(); 1]);
    let err = h.controller.run(admin_address(), ticks).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.controller.summary().cycles, 0);
}
