use alloy::providers::Provider;
use dxmm_core::{AssetBalances, ParticipationState, StatusReport};
use serde::Serialize;

use super::Agent;

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusOutput {
    pub block_number: u64,
    pub current_time: u64,
    pub auction_index: u64,
    pub auction_start: u64,
    pub state: &'static str,
    pub starts_at: Option<u64>,
    pub threshold: String,
    pub missing_to_trigger: String,
    pub trigger_gross: String,
    pub sell_volume: String,
    pub buy_volume: String,
    pub current_price: Option<String>,
    pub remaining_sell: Option<String>,
    pub remaining_buy: Option<String>,
    pub fee_ratio: String,
    pub exchange_balance: BalanceOutput,
    pub custody_balance: BalanceOutput,
    pub claim_cursor: CursorOutput,
    pub pending_claims: Vec<PendingClaimOutput>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BalanceOutput {
    pub token: String,
    pub numeraire: String,
}

impl From<AssetBalances> for BalanceOutput {
    fn from(balances: AssetBalances) -> Self {
        Self {
            token: balances.token.to_string(),
            numeraire: balances.numeraire.to_string(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CursorOutput {
    pub forward: u64,
    pub reverse: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PendingClaimOutput {
    pub direction: String,
    pub round: u64,
    pub side: String,
}

impl From<&StatusReport> for StatusOutput {
    fn from(report: &StatusReport) -> Self {
        let starts_at = match report.state {
            ParticipationState::AuctionTriggeredWaiting { starts_at } => Some(starts_at.as_u64()),
            ParticipationState::NoAuctionTriggered | ParticipationState::AuctionInProgress => None,
        };
        Self {
            block_number: report.block_number,
            current_time: report.current_time.as_u64(),
            auction_index: report.marker.auction_index.as_u64(),
            auction_start: report.marker.auction_start.as_u64(),
            state: report.state.as_str(),
            starts_at,
            threshold: report.trigger.threshold.to_string(),
            missing_to_trigger: report.trigger.missing.to_string(),
            trigger_gross: report.trigger.gross.to_string(),
            sell_volume: report.sell_volume.to_string(),
            buy_volume: report.buy_volume.to_string(),
            current_price: report.current_price.map(|price| price.to_string()),
            remaining_sell: report.remaining_sell.map(|amount| amount.to_string()),
            remaining_buy: report.remaining_buy.map(|amount| amount.to_string()),
            fee_ratio: report.fee_ratio.to_string(),
            exchange_balance: report.balances.exchange.into(),
            custody_balance: report.balances.custody.into(),
            claim_cursor: CursorOutput {
                forward: report.cursor.forward.as_u64(),
                reverse: report.cursor.reverse.as_u64(),
            },
            pending_claims: report
                .pending_claims
                .iter()
                .map(|claim| PendingClaimOutput {
                    direction: format!("{:?}", claim.direction).to_lowercase(),
                    round: claim.round.as_u64(),
                    side: format!("{:?}", claim.side).to_lowercase(),
                })
                .collect(),
        }
    }
}

pub async fn status<P>(agent: &Agent<P>, json: bool) -> eyre::Result<StatusOutput>
where
    P: Provider + Clone + 'static,
{
    let report = agent.inspect().await?;
    let output = StatusOutput::from(&report);

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_status(&output);
    }
    Ok(output)
}

fn print_status(output: &StatusOutput) {
    println!(
        "block {} (t={}): round {} {}",
        output.block_number, output.current_time, output.auction_index, output.state
    );
    if let Some(starts_at) = output.starts_at {
        println!("  starts at {starts_at}");
    }
    println!(
        "  threshold {} | missing {} | trigger sell {}",
        output.threshold, output.missing_to_trigger, output.trigger_gross
    );
    println!(
        "  sell volume {} | buy volume {} | fee {}",
        output.sell_volume, output.buy_volume, output.fee_ratio
    );
    if let Some(price) = &output.current_price {
        println!(
            "  price {price} | remaining sell {} | remaining buy {}",
            output.remaining_sell.as_deref().unwrap_or("-"),
            output.remaining_buy.as_deref().unwrap_or("-")
        );
    }
    println!(
        "  exchange: token {} numeraire {}",
        output.exchange_balance.token, output.exchange_balance.numeraire
    );
    println!(
        "  custody:  token {} numeraire {}",
        output.custody_balance.token, output.custody_balance.numeraire
    );
    println!(
        "  claims settled through forward {} / reverse {}, {} pending",
        output.claim_cursor.forward,
        output.claim_cursor.reverse,
        output.pending_claims.len()
    );
}
