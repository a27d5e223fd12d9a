//! Receipt polling for pending transactions.
//!
//! Polls the gateway at a fixed interval until a receipt appears or the
//! timeout elapses. Connectivity failures while polling are logged and do
//! not end the wait.

use crate::IssuerError;
use issuer_gateway::GatewayService;
use issuer_types::{truncate_id, TransactionHash, TransactionReceipt};
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

/// Result of waiting for a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorResult {
	Mined(TransactionReceipt),
	/// No receipt within the timeout.
	TimedOut(Duration),
}

pub struct ReceiptMonitor {
	gateway: GatewayService,
	poll_interval: Duration,
	timeout: Duration,
}

impl ReceiptMonitor {
	pub fn new(gateway: GatewayService, poll_interval: Duration, timeout: Duration) -> Self {
		Self {
			gateway,
			poll_interval,
			timeout,
		}
	}

	/// Waits for the receipt of `tx_hash`.
	#[instrument(skip_all, fields(tx_hash = %truncate_id(&tx_hash.to_hex())))]
	pub async fn wait(&self, tx_hash: &TransactionHash) -> Result<MonitorResult, IssuerError> {
		let start_time = Instant::now();

		loop {
			match self.gateway.get_receipt(tx_hash).await {
				Ok(Some(receipt)) => return Ok(MonitorResult::Mined(receipt)),
				Ok(None) => {
					tracing::debug!(
						elapsed_ms = start_time.elapsed().as_millis() as u64,
						"Waiting for transaction to be mined"
					);
				}
				Err(e) if e.is_connectivity() => {
					tracing::warn!(error = %e, "Receipt poll failed, will retry");
				}
				Err(e) => return Err(e.into()),
			}

			let elapsed = start_time.elapsed();
			if elapsed >= self.timeout {
				tracing::warn!(
					elapsed_secs = elapsed.as_secs(),
					"Transaction monitoring timeout reached"
				);
				return Ok(MonitorResult::TimedOut(elapsed));
			}
			tokio::time::sleep(self.poll_interval.min(self.timeout - elapsed)).await;
		}
	}
}
