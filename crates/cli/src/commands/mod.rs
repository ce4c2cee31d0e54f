use alloy::{primitives::Address, providers::Provider};
use dxmm_core::{Controller, DxClient, KyberFeed};

use crate::config::DxmmConfig;

pub mod funds;
pub mod run;
pub mod status;

pub type Agent<P> = Controller<DxClient<P>, KyberFeed<P>>;

/// Wires the on-chain adapters for `holder` into a controller.
pub fn build_agent<P>(provider: P, holder: Address, config: &DxmmConfig) -> eyre::Result<Agent<P>>
where
    P: Provider + Clone + 'static,
{
    let agent = config.agent_config();
    let settings = config.cycle_settings();
    let exchange = DxClient::new(provider.clone(), agent, holder, settings.confirmations)?;
    let feed = KyberFeed::new(provider, agent.price_feed);
    let controller = Controller::new(agent, config.access_control()?, settings, exchange, feed)?;
    Ok(controller)
}
