//! Cross-chain reward payouts from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Pay 25 PYUSD from Ethereum Sepolia to a contributor on Arbitrum Sepolia
//! rewardpay pay --amount 25 --from 11155111 --to 421614 --recipient 0x...
//!
//! # Mint a reward NFT on the destination chain instead of paying out
//! rewardpay pay --amount 25 --from 11155111 --to 421614 --recipient 0x... --mint-reward 0x...
//!
//! # List configured chains
//! rewardpay chains
//! ```
//!
//! # Environment Variables
//!
//! - `REWARDPAY_CONFIG` - Path to the TOML configuration (default: `rewardpay.toml`)
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand};
use rewardpay::chain::ChainId;
use rewardpay::progress::{ProgressEvent, ProgressStep, progress_channel};
use rewardpay::{DestinationAction, PaymentRequest, RewardPaymentService};
use rewardpay_bridge::HttpBridgeClient;
use rewardpay_evm::LocalWalletSession;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(long, env = "REWARDPAY_CONFIG", default_value = "rewardpay.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pay a reward across chains.
    Pay(PayArgs),
    /// List configured chains as JSON.
    Chains,
}

#[derive(Args, Debug)]
struct PayArgs {
    /// Amount of the payment token, e.g. `25.5`.
    #[arg(long)]
    amount: String,
    /// Source chain ID.
    #[arg(long)]
    from: ChainId,
    /// Destination chain ID.
    #[arg(long)]
    to: ChainId,
    /// Receiver on the destination chain.
    #[arg(long)]
    recipient: Address,
    /// Mint a reward through this contract instead of paying out through the router.
    #[arg(long)]
    mint_reward: Option<Address>,
}

impl PayArgs {
    fn into_request(self) -> PaymentRequest {
        let action = self
            .mint_reward
            .map_or(DestinationAction::SwapToRecipient, |contract| {
                DestinationAction::MintReward { contract }
            });
        PaymentRequest {
            amount: self.amount,
            source_chain_id: self.from,
            destination_chain_id: self.to,
            recipient_address: self.recipient,
            action,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("rewardpay failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = CliConfig::load_from(&cli.config)?;
    let chains = config.chain_registry()?;
    tracing::debug!(path = %cli.config.display(), chains = chains.configs().len(), "Loaded configuration");

    let args = match cli.command {
        Command::Chains => {
            print_json(&chains.configs())?;
            return Ok(true);
        }
        Command::Pay(args) => args,
    };

    let wallet =
        LocalWalletSession::from_private_key(config.private_key()?, config.client_settings())?;
    tracing::info!(account = %wallet.address(), "Using local wallet");

    let mut bridge = HttpBridgeClient::try_from(config.bridge_url()?)?
        .with_timeout(Duration::from_secs(config.bridge.timeout_secs))
        .with_poll_interval(Duration::from_secs(config.bridge.poll_interval_secs))
        .with_max_polls(config.bridge.max_polls);
    if let Some(api_key) = config.bridge_api_key() {
        bridge = bridge.with_api_key(api_key)?;
    }

    let service =
        RewardPaymentService::new(wallet, bridge, chains).with_config(config.payment_config());

    let (sink, mut events) = progress_channel();
    service.set_progress_sink(sink);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let result = service.pay_cross_chain(args.into_request()).await;
    service.clear_progress_sink();
    printer.await?;

    let result = result?;
    print_json(&result)?;
    Ok(result.success)
}

fn log_event(event: &ProgressEvent) {
    let tx = event.transaction_hash.map(|hash| hash.to_string());
    match event.step {
        ProgressStep::Failed => tracing::error!(
            step = %event.step,
            error = event.error.as_deref().unwrap_or_default(),
            "{}",
            event.message
        ),
        _ if event.retry.is_some() => tracing::warn!(step = %event.step, "{}", event.message),
        _ => tracing::info!(
            step = %event.step,
            tx = tx.as_deref().unwrap_or_default(),
            explorer = event.explorer_url.as_deref().unwrap_or_default(),
            "{}",
            event.message
        ),
    }
}

#[allow(clippy::print_stdout)] // stdout carries the command's JSON output
fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
