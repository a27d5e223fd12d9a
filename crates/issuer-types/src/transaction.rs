//! Transaction records.
//!
//! This module defines the three shapes a transaction takes on its way to the
//! ledger: the unsigned record produced by the builder, the signed record
//! produced by the signer (consumed once by broadcast), and the receipt the
//! node reports after the transaction is mined.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl TransactionHash {
	/// Lowercase hex with `0x` prefix.
	pub fn to_hex(&self) -> String {
		format!("{:#x}", self.0)
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl From<B256> for TransactionHash {
	fn from(hash: B256) -> Self {
		Self(hash)
	}
}

/// Class of operation a transaction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
	/// Contract creation (no recipient).
	Deploy,
	/// Call on an existing contract.
	Call,
}

/// A transaction ready to be signed.
///
/// Built fresh for every attempt; a record is never reused across nonces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
	/// Sending account.
	pub from: Address,
	/// Recipient contract. `None` deploys `data` as init code.
	pub to: Option<Address>,
	/// Account nonce.
	pub nonce: u64,
	/// Maximum gas the transaction may consume.
	pub gas_limit: u64,
	/// Gas price in wei.
	pub gas_price: u128,
	/// EIP-155 chain id.
	pub chain_id: u64,
	/// Init code plus constructor arguments, or selector plus call arguments.
	pub data: Bytes,
}

impl UnsignedTransaction {
	pub fn kind(&self) -> TransactionKind {
		match self.to {
			Some(_) => TransactionKind::Call,
			None => TransactionKind::Deploy,
		}
	}

	pub fn is_deployment(&self) -> bool {
		self.to.is_none()
	}

	/// Worst-case fee in wei (`gas_limit * gas_price`).
	pub fn max_fee(&self) -> U256 {
		U256::from(self.gas_limit) * U256::from(self.gas_price)
	}
}

/// ECDSA signature components.
///
/// `v` is the EIP-155 value (`chain_id * 2 + 35 + y_parity`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParts {
	pub r: U256,
	pub s: U256,
	pub v: u64,
}

/// A signed transaction together with its wire encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
	/// The record that was signed.
	pub transaction: UnsignedTransaction,
	/// Signature over the canonical encoding.
	pub signature: SignatureParts,
	/// Hash of the signed transaction; the node reports the same value.
	pub hash: TransactionHash,
	/// EIP-2718 encoded bytes submitted with `eth_sendRawTransaction`.
	pub raw: Bytes,
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub transaction_hash: TransactionHash,
	/// Whether execution succeeded. A `false` status means the transaction
	/// reverted: it was mined, fees were spent, state was left unchanged.
	pub success: bool,
	/// Address of the created contract; present only for deployments.
	pub contract_address: Option<Address>,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Gas consumed by execution.
	pub gas_used: u64,
}
