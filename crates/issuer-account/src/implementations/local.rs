//! Local private-key account implementation.
//!
//! Signs EIP-155 legacy transactions with a secp256k1 key held in process
//! memory. ECDSA nonces are derived per RFC 6979, so signing the same
//! transaction twice yields the same signature and hash.

use crate::{AccountError, AccountInterface};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use issuer_types::{
	Address, Bytes, ConfigSchema, Field, FieldType, PrivateCredential, Schema, SignatureParts,
	SignedTransaction, TransactionHash, UnsignedTransaction, ValidationError,
};

/// Account backed by a private key held in memory.
pub struct LocalAccount {
	signer: PrivateKeySigner,
}

impl LocalAccount {
	/// Creates an account from a hex-encoded private key.
	///
	/// The error never echoes the key material.
	pub fn new(credential: &PrivateCredential) -> Result<Self, AccountError> {
		if credential.is_empty() {
			return Err(AccountError::InvalidKey("private key is empty".to_string()));
		}
		let signer = credential.with_exposed(|key| {
			key.parse::<PrivateKeySigner>().map_err(|_| {
				AccountError::InvalidKey("expected a 32-byte hex-encoded secp256k1 key".to_string())
			})
		})?;
		Ok(Self { signer })
	}

	fn sign_legacy(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction, AccountError> {
		if tx.from != self.signer.address() {
			return Err(AccountError::SigningFailed(format!(
				"transaction sender {} does not match account {}",
				tx.from,
				self.signer.address()
			)));
		}

		let mut legacy = TxLegacy {
			chain_id: Some(tx.chain_id),
			nonce: tx.nonce,
			gas_price: tx.gas_price,
			gas_limit: tx.gas_limit,
			to: match tx.to {
				Some(to) => TxKind::Call(to),
				None => TxKind::Create,
			},
			value: U256::ZERO,
			input: tx.data.clone(),
		};

		let signature = self
			.signer
			.sign_transaction_sync(&mut legacy)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		let parts = SignatureParts {
			r: signature.r(),
			s: signature.s(),
			v: tx.chain_id * 2 + 35 + u64::from(signature.v()),
		};

		let signed = legacy.into_signed(signature);
		let hash = TransactionHash(*signed.hash());
		let raw = Bytes::from(TxEnvelope::Legacy(signed).encoded_2718());

		Ok(SignedTransaction {
			transaction: tx.clone(),
			signature: parts,
			hash,
			raw,
		})
	}
}

/// Configuration schema for LocalAccount.
pub struct LocalAccountSchema;

impl LocalAccountSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for LocalAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let hex = issuer_types::without_0x_prefix(key.trim());
					if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("must be 64 hex characters, optionally 0x-prefixed".to_string());
					}
					Ok(())
				}),
			],
			vec![
				Field::new("address", FieldType::String).with_validator(|value| {
					match value.as_str().map(str::trim) {
						Some("") | None => Ok(()),
						Some(addr) => addr
							.parse::<Address>()
							.map(|_| ())
							.map_err(|e| format!("invalid address: {}", e)),
					}
				}),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalAccountSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError> {
		self.sign_legacy(tx)
	}
}

/// Factory function to create an account from configuration.
///
/// Configuration parameters:
/// - `private_key`: Hex-encoded private key (with or without 0x prefix)
/// - `address` (optional): Expected wallet address; must match the key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountSchema::validate_config(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let credential = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(PrivateCredential::from)
		.ok_or_else(|| AccountError::InvalidKey("Private key is required".to_string()))?;

	let account = LocalAccount::new(&credential)?;

	let expected = config
		.get("address")
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|s| !s.is_empty());
	if let Some(expected) = expected {
		let expected: Address = expected
			.parse()
			.map_err(|e| AccountError::Implementation(format!("Invalid address: {}", e)))?;
		if expected != account.signer.address() {
			return Err(AccountError::InvalidKey(format!(
				"configured address {} does not match the private key",
				expected
			)));
		}
	}

	tracing::info!(address = %account.signer.address(), "Loaded local account");
	Ok(Box::new(account))
}

/// Registry for the local account implementation.
pub struct Registry;

impl issuer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}
