use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};

use dxmm_cli::{
    commands::{build_agent, funds, run, status},
    config::{DEFAULT_CONFIG_PATH, load_config, resolve_config_path},
    logging, provider,
};

#[derive(Debug, Parser)]
#[command(name = "dxmm", about = "DutchX market-making agent", version)]
struct Cli {
    /// Path to the agent configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: PathBuf,

    /// RPC URL of the chain the exchange is deployed on
    #[arg(long, env = "DXMM_RPC_URL", value_name = "URL")]
    rpc_url: Option<String>,

    /// Hex private key of the holder account
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true, value_name = "KEY")]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the agent loop until interrupted
    Run,

    /// Run a single cycle and print what it did
    Cycle,

    /// Show the current round, balances and pending claims
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,

        /// Account to report on; defaults to the PRIVATE_KEY address
        #[arg(long, value_name = "ADDRESS")]
        holder: Option<Address>,
    },

    /// Move funds from the holder wallet onto the exchange
    Deposit(FundsArgs),

    /// Move funds from the exchange back to the holder wallet
    Withdraw(FundsArgs),

    /// Send funds from the holder wallet to another address
    WithdrawCustody {
        #[command(flatten)]
        funds: FundsArgs,

        /// Recipient address
        #[arg(long, value_name = "ADDRESS")]
        to: Address,
    },
}

#[derive(Debug, Args)]
struct FundsArgs {
    /// `token`, `numeraire` or an ERC-20 address
    #[arg(long, value_name = "ASSET")]
    asset: String,

    /// Amount in whole-token units, e.g. 1.5
    #[arg(long, value_name = "AMOUNT")]
    amount: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    let path = resolve_config_path(&cli.config);
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };
    logging::init(&config.logging)?;

    let rpc_url = cli
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre::eyre!("--rpc-url or DXMM_RPC_URL is required"))?;

    if let Commands::Status { json, holder } = cli.command {
        let holder = match holder {
            Some(holder) => holder,
            None => provider::holder_from_key(require_key(cli.private_key.as_deref())?)?,
        };
        let provider = provider::connect_read_only(rpc_url).await?;
        let agent = build_agent(provider, holder, &config)?;
        status::status(&agent, json).await?;
        return Ok(());
    }

    let private_key = require_key(cli.private_key.as_deref())?;
    let (provider, holder) = provider::connect(rpc_url, private_key).await?;
    let mut agent = build_agent(provider.clone(), holder, &config)?;

    match cli.command {
        Commands::Run => {
            run::run(&mut agent, holder, config.cycle_settings().poll_interval).await?;
        }
        Commands::Cycle => {
            run::cycle(&mut agent, holder).await?;
        }
        Commands::Status { .. } => {}
        Commands::Deposit(args) => {
            funds::deposit(&agent, &provider, holder, &args.asset, &args.amount).await?;
        }
        Commands::Withdraw(args) => {
            funds::withdraw(&agent, &provider, holder, &args.asset, &args.amount).await?;
        }
        Commands::WithdrawCustody { funds: args, to } => {
            funds::withdraw_custody(&agent, &provider, holder, &args.asset, &args.amount, to)
                .await?;
        }
    }

    Ok(())
}

fn require_key(private_key: Option<&str>) -> eyre::Result<&str> {
    private_key.ok_or_else(|| eyre::eyre!("--private-key or PRIVATE_KEY is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_takes_an_explicit_holder() {
        let cli = Cli::try_parse_from([
            "dxmm",
            "status",
            "--json",
            "--holder",
            "0x000000000000000000000000000000000000000a",
        ])
        .unwrap();
        let Commands::Status { json, holder } = cli.command else {
            panic!("expected status, got {:?}", cli.command);
        };
        assert!(json);
        assert_eq!(holder, Some(Address::with_last_byte(0x0a)));
    }

    #[test]
    fn status_holder_is_optional() {
        let cli = Cli::try_parse_from(["dxmm", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { holder: None, .. }));
    }
}
