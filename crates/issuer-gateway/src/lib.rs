//! RPC gateway module for the token issuer.
//!
//! This module is the only place that talks to the JSON-RPC node. It exposes
//! the handful of calls the lifecycle manager needs (chain id, pending nonce,
//! gas price, raw broadcast, receipts, read-only calls) and translates node
//! and transport failures into two error classes the caller can act on.
//! Nothing here retries.

use async_trait::async_trait;
use issuer_types::{
	Address, Bytes, ConfigSchema, ImplementationRegistry, SignedTransaction, TransactionHash,
	TransactionReceipt, UnsignedTransaction,
};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod mock;
}

/// Node messages meaning the nonce was already used or is being replaced.
const NONCE_CONFLICT_MESSAGES: &[&str] = &[
	"nonce too low",
	"replacement transaction underpriced",
];

/// Node messages meaning the identical transaction is already in the pool.
const ALREADY_KNOWN_MESSAGES: &[&str] = &[
	"already known",
	"known transaction",
	"already imported",
];

/// Errors that can occur during gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
	/// The node could not be reached, the transport failed or a call timed out.
	#[error("Connectivity error: {0}")]
	Connectivity(String),
	/// The node answered with a JSON-RPC error.
	#[error("Node rejected request: {0}")]
	NodeRejected(String),
	/// Error that occurs when constructing the gateway implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

impl GatewayError {
	fn rejection_matches(&self, patterns: &[&str]) -> bool {
		match self {
			GatewayError::NodeRejected(message) => {
				let message = message.to_lowercase();
				patterns.iter().any(|p| message.contains(p))
			}
			_ => false,
		}
	}

	/// True when the node refused a transaction because its nonce is stale.
	pub fn is_nonce_conflict(&self) -> bool {
		self.rejection_matches(NONCE_CONFLICT_MESSAGES)
	}

	/// True when the node already holds the identical transaction.
	pub fn is_already_known(&self) -> bool {
		self.rejection_matches(ALREADY_KNOWN_MESSAGES)
	}

	pub fn is_connectivity(&self) -> bool {
		matches!(self, GatewayError::Connectivity(_))
	}
}

/// Trait defining the interface for RPC gateway implementations.
#[async_trait]
pub trait GatewayInterface: Send + Sync {
	/// Returns the configuration schema for this gateway implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Chain id reported by the node.
	async fn get_chain_id(&self) -> Result<u64, GatewayError>;

	/// Transaction count of `address`, including transactions still pending
	/// in the node's pool.
	async fn get_nonce(&self, address: Address) -> Result<u64, GatewayError>;

	/// Current gas price quote in wei.
	async fn get_gas_price(&self) -> Result<u128, GatewayError>;

	/// Submits the raw signed transaction and returns the hash the node reports.
	async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionHash, GatewayError>;

	/// Receipt of a mined transaction, or `None` while it is not mined.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, GatewayError>;

	/// Read-only `eth_call` against the latest block.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError>;

	/// Replays a mined transaction against the state before `block_number` and
	/// decodes an `Error(string)` revert reason, when there is one.
	async fn revert_reason(
		&self,
		tx: &UnsignedTransaction,
		block_number: u64,
	) -> Result<Option<String>, GatewayError>;
}

/// Type alias for gateway factory functions.
pub type GatewayFactory = fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>;

/// Registry trait for gateway implementations.
pub trait GatewayRegistry: ImplementationRegistry<Factory = GatewayFactory> {}

/// Get all registered gateway implementations.
///
/// Returns a vector of (name, factory) tuples for all available gateway implementations.
pub fn get_all_implementations() -> Vec<(&'static str, GatewayFactory)> {
	use implementations::{evm::alloy, mock};

	vec![
		(alloy::Registry::NAME, alloy::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

/// Service wrapping the configured gateway implementation.
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct GatewayService {
	implementation: Arc<dyn GatewayInterface>,
}

impl GatewayService {
	pub fn new(implementation: Box<dyn GatewayInterface>) -> Self {
		Self {
			implementation: Arc::from(implementation),
		}
	}

	pub async fn get_chain_id(&self) -> Result<u64, GatewayError> {
		self.implementation.get_chain_id().await
	}

	pub async fn get_nonce(&self, address: Address) -> Result<u64, GatewayError> {
		let nonce = self.implementation.get_nonce(address).await?;
		tracing::trace!(%address, nonce, "Fetched pending nonce");
		Ok(nonce)
	}

	pub async fn get_gas_price(&self) -> Result<u128, GatewayError> {
		self.implementation.get_gas_price().await
	}

	/// Broadcasts a signed transaction.
	pub async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionHash, GatewayError> {
		match self.implementation.broadcast(tx).await {
			Ok(hash) => {
				tracing::info!(
					tx_hash = %issuer_types::truncate_id(&hash.to_hex()),
					nonce = tx.transaction.nonce,
					"Submitted transaction"
				);
				Ok(hash)
			}
			Err(e) => {
				tracing::warn!(nonce = tx.transaction.nonce, error = %e, "Broadcast failed");
				Err(e)
			}
		}
	}

	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, GatewayError> {
		self.implementation.get_receipt(hash).await
	}

	pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
		self.implementation.call(to, data).await
	}

	pub async fn revert_reason(
		&self,
		tx: &UnsignedTransaction,
		block_number: u64,
	) -> Result<Option<String>, GatewayError> {
		self.implementation.revert_reason(tx, block_number).await
	}
}
