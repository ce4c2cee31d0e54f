use alloy::{primitives::Address, providers::Provider};
use dxmm_abi::IERC20Minimal;
use dxmm_core::{AgentConfig, BalanceReceipt, TransferReceipt};
use eyre::eyre;

use super::Agent;
use crate::units::{format_amount, parse_amount};

/// `token`, `numeraire`, or a literal address.
pub fn resolve_asset(asset: &str, config: &AgentConfig) -> eyre::Result<Address> {
    match asset.trim().to_ascii_lowercase().as_str() {
        "token" => Ok(config.token),
        "numeraire" => Ok(config.numeraire),
        other => other
            .parse()
            .map_err(|_| eyre!("unknown asset {asset:?}: use token, numeraire or an address")),
    }
}

async fn decimals<P>(provider: &P, asset: Address) -> eyre::Result<u8>
where
    P: Provider + Clone + 'static,
{
    Ok(IERC20Minimal::new(asset, provider).decimals().call().await?)
}

pub async fn deposit<P>(
    agent: &Agent<P>,
    provider: &P,
    caller: Address,
    asset: &str,
    amount: &str,
) -> eyre::Result<BalanceReceipt>
where
    P: Provider + Clone + 'static,
{
    let asset = resolve_asset(asset, agent.config())?;
    let decimals = decimals(provider, asset).await?;
    let amount = parse_amount(amount, decimals)?;

    let receipt = agent.deposit(caller, asset, amount).await?;
    println!(
        "deposited {} of {asset}, exchange balance {} (tx {})",
        format_amount(amount, decimals),
        format_amount(receipt.new_balance, decimals),
        receipt.tx_hash
    );
    Ok(receipt)
}

pub async fn withdraw<P>(
    agent: &Agent<P>,
    provider: &P,
    caller: Address,
    asset: &str,
    amount: &str,
) -> eyre::Result<BalanceReceipt>
where
    P: Provider + Clone + 'static,
{
    let asset = resolve_asset(asset, agent.config())?;
    let decimals = decimals(provider, asset).await?;
    let amount = parse_amount(amount, decimals)?;

    let receipt = agent.withdraw(caller, asset, amount).await?;
    println!(
        "withdrew {} of {asset}, exchange balance {} (tx {})",
        format_amount(amount, decimals),
        format_amount(receipt.new_balance, decimals),
        receipt.tx_hash
    );
    Ok(receipt)
}

pub async fn withdraw_custody<P>(
    agent: &Agent<P>,
    provider: &P,
    caller: Address,
    asset: &str,
    amount: &str,
    to: Address,
) -> eyre::Result<TransferReceipt>
where
    P: Provider + Clone + 'static,
{
    let asset = resolve_asset(asset, agent.config())?;
    let decimals = decimals(provider, asset).await?;
    let amount = parse_amount(amount, decimals)?;

    let receipt = agent.withdraw_from_custody(caller, asset, amount, to).await?;
    println!(
        "sent {} of {asset} to {to} (tx {})",
        format_amount(amount, decimals),
        receipt.tx_hash
    );
    Ok(receipt)
}
