//! Error type of the issuer core.
//!
//! Errors from the lower crates are converted with `From` so `?` works across
//! crate boundaries. `kind()` sorts every error into what the caller should
//! do about it.

use issuer_account::AccountError;
use issuer_config::ConfigError;
use issuer_contract::ContractError;
use issuer_gateway::GatewayError;
use issuer_types::{TransactionHash, TransactionState};
use thiserror::Error;

/// What a caller can do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Fix the input (arguments, configuration) and try again.
	InvalidInput,
	/// Try again later; nothing was decided on chain.
	Transient,
	/// The node refused the transaction.
	Rejected,
	/// Retrying the same operation will not help.
	Fatal,
}

#[derive(Debug, Error)]
pub enum IssuerError {
	#[error("Connectivity error: {0}")]
	Connectivity(String),
	#[error("Node rejected transaction: {0}")]
	NodeRejected(String),
	#[error("Compilation failed: {0}")]
	Compilation(String),
	#[error("Signing failed: {0}")]
	Signing(String),
	#[error("Encoding error: {0}")]
	Encoding(String),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Deployment {0} succeeded but its receipt has no contract address")]
	MissingContractAddress(TransactionHash),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition {
		from: TransactionState,
		to: TransactionState,
	},
}

impl IssuerError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			IssuerError::Connectivity(_) => ErrorKind::Transient,
			IssuerError::NodeRejected(_) => ErrorKind::Rejected,
			IssuerError::Encoding(_) | IssuerError::Config(_) => ErrorKind::InvalidInput,
			IssuerError::Compilation(_)
			| IssuerError::Signing(_)
			| IssuerError::MissingContractAddress(_)
			| IssuerError::InvalidTransition { .. } => ErrorKind::Fatal,
		}
	}
}

impl From<GatewayError> for IssuerError {
	fn from(err: GatewayError) -> Self {
		match err {
			GatewayError::Connectivity(msg) => IssuerError::Connectivity(msg),
			GatewayError::NodeRejected(msg) => IssuerError::NodeRejected(msg),
			GatewayError::Implementation(msg) => IssuerError::Config(msg),
		}
	}
}

impl From<AccountError> for IssuerError {
	fn from(err: AccountError) -> Self {
		IssuerError::Signing(err.to_string())
	}
}

impl From<ContractError> for IssuerError {
	fn from(err: ContractError) -> Self {
		match err {
			ContractError::Compilation(msg) => IssuerError::Compilation(msg),
			ContractError::Encoding(msg) => IssuerError::Encoding(msg),
			ContractError::Artifact(msg) => IssuerError::Compilation(msg),
		}
	}
}

impl From<ConfigError> for IssuerError {
	fn from(err: ConfigError) -> Self {
		IssuerError::Config(err.to_string())
	}
}
