use std::time::Duration;

use alloy::{primitives::Address, providers::Provider};
use dxmm_core::{ClaimStatus, CycleAction, CycleReport, RunSummary, schedule::Schedule};
use tracing::info;

use super::Agent;

/// Polls every `poll_interval` until Ctrl-C or a failure that needs an
/// operator.
pub async fn run<P>(
    agent: &mut Agent<P>,
    operator: Address,
    poll_interval: Duration,
) -> eyre::Result<RunSummary>
where
    P: Provider + Clone + 'static,
{
    let (threshold_usd, oracle) = agent.exchange().fetch_parameters().await?;
    info!(
        exchange = %agent.config().exchange,
        token = %agent.config().token,
        numeraire = %agent.config().numeraire,
        %threshold_usd,
        %oracle,
        poll_secs = poll_interval.as_secs(),
        "agent starting"
    );

    let ticks = Schedule::new(poll_interval).into_stream();
    let finished = tokio::select! {
        result = agent.run(operator, ticks) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let summary = match finished {
        Some(result) => result?,
        None => {
            info!("interrupted");
            agent.summary()
        }
    };
    print_summary(&summary);
    Ok(summary)
}

pub async fn cycle<P>(agent: &mut Agent<P>, operator: Address) -> eyre::Result<CycleReport>
where
    P: Provider + Clone + 'static,
{
    let report = agent.run_cycle(operator).await?;
    print_report(&report);
    Ok(report)
}

fn print_report(report: &CycleReport) {
    println!("block {}: {}", report.block_number, report.state.as_str());
    for outcome in &report.claims {
        let status = match outcome.status {
            ClaimStatus::Claimed { tx_hash } => format!("claimed {} (tx {tx_hash})", outcome.returned),
            ClaimStatus::RoundNotYetClosed => "round not yet closed".to_string(),
        };
        println!(
            "  claim {:?} round {} {:?}: {status}",
            outcome.command.direction, outcome.command.round, outcome.command.side
        );
    }

    match &report.action {
        CycleAction::Idle { threshold } => {
            println!("  idle: sell volume already at threshold {threshold}")
        }
        CycleAction::Triggered {
            plan,
            funding,
            receipt,
        } => println!(
            "  triggered round {}: sold {} ({} credited, {funding:?}) tx {}",
            receipt.auction_index, plan.gross, receipt.amount, receipt.tx_hash
        ),
        CycleAction::Waiting { starts_at } => println!("  waiting for round start at {starts_at}"),
        CycleAction::BoughtBack { plan, receipt } => println!(
            "  bought back round {} at {} (reference {}): {} tx {}",
            plan.round, plan.price, plan.reference, receipt.amount, receipt.tx_hash
        ),
        CycleAction::Held { price, reference } => match (price, reference) {
            (Some(price), Some(reference)) => {
                println!("  holding: auction {price}, reference {reference}")
            }
            _ => println!("  holding: no auction price yet"),
        },
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} cycles ({} failed), {} claims, {} triggers, {} buy-backs",
        summary.cycles, summary.failed_cycles, summary.claims, summary.triggers, summary.buy_backs
    );
}
