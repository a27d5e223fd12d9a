//! Compiled contract artifacts.

use crate::ContractError;
use alloy::json_abi::JsonAbi;
use issuer_types::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Output of compilation: the contract's ABI and creation bytecode.
///
/// Immutable once produced; share it with `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
	pub name: String,
	pub abi: JsonAbi,
	pub bytecode: Bytes,
}

/// On-disk artifact layout. `bytecode` is either a hex string or an object
/// with an `object` field, as emitted by Foundry and Hardhat.
#[derive(Deserialize)]
struct ArtifactFile {
	#[serde(default, alias = "contractName")]
	name: Option<String>,
	abi: JsonAbi,
	bytecode: BytecodeField,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
	Hex(String),
	Object { object: String },
}

impl ContractArtifact {
	pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: Bytes) -> Self {
		Self {
			name: name.into(),
			abi,
			bytecode,
		}
	}

	/// Parses a precompiled JSON artifact.
	///
	/// `fallback_name` is used when the file carries no contract name.
	pub fn from_json(json: &str, fallback_name: &str) -> Result<Self, ContractError> {
		let file: ArtifactFile = serde_json::from_str(json)
			.map_err(|e| ContractError::Artifact(format!("Invalid artifact JSON: {}", e)))?;

		let hex_code = match &file.bytecode {
			BytecodeField::Hex(code) => code,
			BytecodeField::Object { object } => object,
		};
		let bytecode = parse_bytecode(hex_code)?;

		Ok(Self {
			name: file.name.unwrap_or_else(|| fallback_name.to_string()),
			abi: file.abi,
			bytecode,
		})
	}
}

/// Decodes hex creation bytecode, rejecting empty or unlinked code.
pub(crate) fn parse_bytecode(code: &str) -> Result<Bytes, ContractError> {
	let code = issuer_types::without_0x_prefix(code.trim());
	if code.is_empty() {
		return Err(ContractError::Artifact(
			"Bytecode is empty; abstract contracts and interfaces cannot be deployed".to_string(),
		));
	}
	if code.contains("__") {
		return Err(ContractError::Artifact(
			"Bytecode contains unlinked library placeholders".to_string(),
		));
	}
	hex::decode(code)
		.map(Bytes::from)
		.map_err(|e| ContractError::Artifact(format!("Invalid bytecode hex: {}", e)))
}

/// A contract known to exist on chain.
///
/// Created only from a successful deployment receipt, or attached to an
/// address the caller vouches for.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedContract {
	pub address: Address,
	pub artifact: Arc<ContractArtifact>,
}

impl DeployedContract {
	pub fn new(address: Address, artifact: Arc<ContractArtifact>) -> Self {
		Self { address, artifact }
	}

	pub fn name(&self) -> &str {
		&self.artifact.name
	}
}
