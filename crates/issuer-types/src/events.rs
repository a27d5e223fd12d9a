//! Lifecycle events.
//!
//! Every state change of a submitted operation is published as a
//! `LifecycleEvent`, letting a front-end render progress without embedding
//! RPC calls in its own event handlers.

use crate::{TransactionHash, TransactionKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// States of an operation in the transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
	/// Unsigned transaction assembled with a reserved nonce.
	Built,
	/// Signature attached.
	Signed,
	/// Raw transaction handed to the node.
	Broadcast,
	/// Node accepted the transaction; waiting for a receipt.
	Pending,
	/// Mined with a success status.
	Confirmed,
	/// Mined with a failure status.
	Reverted,
	/// No receipt within the configured timeout. The transaction may still
	/// be mined later.
	Stuck,
}

impl TransactionState {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransactionState::Confirmed | TransactionState::Reverted | TransactionState::Stuck
		)
	}
}

impl fmt::Display for TransactionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			TransactionState::Built => "BUILT",
			TransactionState::Signed => "SIGNED",
			TransactionState::Broadcast => "BROADCAST",
			TransactionState::Pending => "PENDING",
			TransactionState::Confirmed => "CONFIRMED",
			TransactionState::Reverted => "REVERTED",
			TransactionState::Stuck => "STUCK",
		};
		f.write_str(name)
	}
}

/// A state transition of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
	/// Identifier shared by every event of the same operation.
	pub operation_id: String,
	/// Deployment or call.
	pub kind: TransactionKind,
	/// State entered.
	pub state: TransactionState,
	/// Nonce of the current attempt, once reserved.
	pub nonce: Option<u64>,
	/// Transaction hash, once signed.
	pub tx_hash: Option<TransactionHash>,
	/// Broadcast attempt number, starting at 1.
	pub attempt: u32,
}
