//! Account management module for the token issuer.
//!
//! This module provides abstractions for the signing account. It defines the
//! interface implementations use to expose their address and sign
//! transactions, and a service wrapping the configured implementation. The
//! private credential never leaves the implementation.

use async_trait::async_trait;
use issuer_types::{
	Address, ConfigSchema, ImplementationRegistry, SignedTransaction, UnsignedTransaction,
};
use thiserror::Error;

/// Signer implementations.
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The transaction could not be signed, or names another sender.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The configured credential is malformed. Never carries key material.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Configuration or backend failure of the implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// A signing account.
///
/// Implementations own the private credential and hand out only the derived
/// address and finished signatures.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Schema of the implementation's TOML section.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address derived from the credential.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs `tx` as an EIP-155 transaction for `tx.chain_id`.
	///
	/// Fails with `SigningFailed` when `tx.from` is not this account.
	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError>;
}

/// Builds an account from its TOML section.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry entry of an account implementation.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Name and factory of every account implementation in this crate.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// The configured signer, with signing traced.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Address every transaction is sent from.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs `tx`; the hash is logged, the key never is.
	pub async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction, AccountError> {
		let signed = self.implementation.sign_transaction(tx).await?;
		tracing::debug!(
			nonce = tx.nonce,
			tx_hash = %issuer_types::truncate_id(&signed.hash.to_hex()),
			"Signed transaction"
		);
		Ok(signed)
	}
}
