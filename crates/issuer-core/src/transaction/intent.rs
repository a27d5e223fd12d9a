//! High-level transaction intents.

use alloy::dyn_abi::DynSolValue;
use issuer_contract::{ContractArtifact, DeployedContract};
use issuer_types::TransactionKind;
use std::sync::Arc;

/// What the caller wants done on chain.
#[derive(Debug, Clone)]
pub enum TransactionIntent {
	/// Deploy `artifact` with the given constructor arguments.
	Deploy {
		artifact: Arc<ContractArtifact>,
		constructor_args: Vec<DynSolValue>,
		/// Overrides the configured deployment gas ceiling.
		gas_limit: Option<u64>,
	},
	/// Call `function` (name or full signature) on a deployed contract.
	Call {
		contract: DeployedContract,
		function: String,
		args: Vec<DynSolValue>,
		/// Overrides the configured call gas ceiling.
		gas_limit: Option<u64>,
	},
}

impl TransactionIntent {
	pub fn deploy(artifact: Arc<ContractArtifact>, constructor_args: Vec<DynSolValue>) -> Self {
		TransactionIntent::Deploy {
			artifact,
			constructor_args,
			gas_limit: None,
		}
	}

	pub fn call(
		contract: DeployedContract,
		function: impl Into<String>,
		args: Vec<DynSolValue>,
	) -> Self {
		TransactionIntent::Call {
			contract,
			function: function.into(),
			args,
			gas_limit: None,
		}
	}

	/// Sets an explicit gas limit for this intent.
	pub fn with_gas_limit(mut self, limit: u64) -> Self {
		match &mut self {
			TransactionIntent::Deploy { gas_limit, .. } | TransactionIntent::Call { gas_limit, .. } => {
				*gas_limit = Some(limit)
			}
		}
		self
	}

	pub fn kind(&self) -> TransactionKind {
		match self {
			TransactionIntent::Deploy { .. } => TransactionKind::Deploy,
			TransactionIntent::Call { .. } => TransactionKind::Call,
		}
	}

	/// Short human-readable description for logs.
	pub fn describe(&self) -> String {
		match self {
			TransactionIntent::Deploy { artifact, .. } => format!("deploy {}", artifact.name),
			TransactionIntent::Call {
				contract, function, ..
			} => format!("{}.{} at {}", contract.name(), function, contract.address),
		}
	}
}
