//! Issuance runner.
//!
//! Loads the configuration, connects to the configured node and carries out
//! one issuance: deploys the bundled MemeCoin token (or attaches to the
//! configured deployment), sends the configured transfers and reports the
//! resulting balances. Lifecycle events of every operation are logged as
//! they happen.

use clap::Parser;
use issuer_config::{Config, TransferConfig};
use issuer_core::{
	default_factories, DeploymentOutcome, Issuer, IssuerBuilder, IssuerError, TokenProxy,
	TransactionOutcome,
};
use issuer_types::{truncate_id, Address, LifecycleEvent};
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::RecvError};

/// Command-line arguments for the issuer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started issuer");

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		chain_id = config.network.chain_id,
		gateway = %config.gateway.primary,
		"Loaded configuration"
	);

	let issuer = IssuerBuilder::new(config)
		.build(default_factories())
		.await?;
	issuer.initialize().await?;

	let events = tokio::spawn(log_events(issuer.subscribe()));
	let result = run(&issuer).await;
	events.abort();

	let token = result?;
	tracing::info!(token = %token, "Issuance finished");
	Ok(())
}

/// Logs lifecycle events until the bus closes.
async fn log_events(mut events: broadcast::Receiver<LifecycleEvent>) {
	loop {
		match events.recv().await {
			Ok(event) => tracing::info!(
				operation_id = %truncate_id(&event.operation_id),
				kind = ?event.kind,
				state = %event.state,
				nonce = ?event.nonce,
				tx_hash = %event.tx_hash.map(|h| truncate_id(&h.to_hex())).unwrap_or_default(),
				attempt = event.attempt,
				"Lifecycle"
			),
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event log fell behind");
			}
			Err(RecvError::Closed) => break,
		}
	}
}

/// Carries out the configured issuance and returns the token address.
///
/// Every configured transfer is attempted even when an earlier one reverts,
/// gets stuck or is refused by the node; the run fails afterwards if any of
/// them did not confirm.
async fn run(issuer: &Issuer) -> Result<Address, Box<dyn std::error::Error>> {
	let token = obtain_token(issuer).await?;
	println!(
		"token: {} ({}) at {}",
		token.name().await?,
		token.symbol().await?,
		token.address()
	);

	let transfers = &issuer.config().token.transfers;
	let mut holders = vec![issuer.address()];
	let mut failed = 0;
	for transfer in transfers {
		let confirmed = match send_transfer(&token, transfer).await {
			Ok(outcome) => {
				println!(
					"transfer {} to {}: {}",
					transfer.amount,
					transfer.to,
					describe_outcome(&outcome)
				);
				matches!(outcome, TransactionOutcome::Confirmed { .. })
			}
			Err(e) => {
				tracing::error!(to = %transfer.to, amount = %transfer.amount, error = %e, "Transfer failed");
				println!("transfer {} to {}: FAILED {}", transfer.amount, transfer.to, e);
				false
			}
		};
		if !confirmed {
			failed += 1;
		}
		if !holders.contains(&transfer.to) {
			holders.push(transfer.to);
		}
	}

	let symbol = token.symbol().await?;
	for holder in holders {
		let balance = token.balance_of(holder).await?;
		println!(
			"balance {}: {} {}",
			holder,
			token.format_amount(balance).await?,
			symbol
		);
	}

	if failed > 0 {
		return Err(format!("{} of {} transfers did not confirm", failed, transfers.len()).into());
	}
	Ok(token.address())
}

async fn send_transfer(
	token: &TokenProxy,
	transfer: &TransferConfig,
) -> Result<TransactionOutcome, IssuerError> {
	let amount = token.parse_amount(&transfer.amount).await?;
	token.transfer(transfer.to, amount).await
}

/// Attaches to the configured token, or deploys a new one.
async fn obtain_token(issuer: &Issuer) -> Result<TokenProxy, Box<dyn std::error::Error>> {
	if let Some(address) = issuer.config().token.address {
		tracing::info!(token = %address, "Using existing deployment");
		return Ok(issuer.attach_token(address)?);
	}

	let outcome = issuer.deploy_configured_token().await?;
	println!("{}", describe_deployment(&outcome));
	match outcome {
		DeploymentOutcome::Deployed { contract, .. } => Ok(issuer.token(contract)),
		_ => Err("token deployment did not confirm".into()),
	}
}

fn describe_outcome(outcome: &TransactionOutcome) -> String {
	match outcome {
		TransactionOutcome::Confirmed { receipt } => format!(
			"CONFIRMED {} in block {}",
			receipt.transaction_hash, receipt.block_number
		),
		TransactionOutcome::Reverted { receipt, reason } => format!(
			"REVERTED {} in block {}: {}",
			receipt.transaction_hash,
			receipt.block_number,
			reason.as_deref().unwrap_or("no reason given")
		),
		TransactionOutcome::Stuck {
			tx_hash,
			nonce,
			elapsed,
		} => describe_stuck(tx_hash, *nonce, elapsed.as_secs()),
	}
}

fn describe_deployment(outcome: &DeploymentOutcome) -> String {
	match outcome {
		DeploymentOutcome::Deployed { contract, receipt } => format!(
			"DEPLOYED {} at {} ({})",
			contract.name(),
			contract.address,
			receipt.transaction_hash
		),
		DeploymentOutcome::Reverted { receipt, reason } => format!(
			"REVERTED deployment {}: {}",
			receipt.transaction_hash,
			reason.as_deref().unwrap_or("no reason given")
		),
		DeploymentOutcome::Stuck {
			tx_hash,
			nonce,
			elapsed,
		} => describe_stuck(tx_hash, *nonce, elapsed.as_secs()),
	}
}

fn describe_stuck(tx_hash: &impl std::fmt::Display, nonce: u64, seconds: u64) -> String {
	format!(
		"STUCK {} (nonce {}) after {}s without a receipt",
		tx_hash, nonce, seconds
	)
}
