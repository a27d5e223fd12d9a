//! Compiler implementation that runs the `solc` binary.
//!
//! Source is piped on stdin and solc is asked for `--combined-json abi,bin`.
//! Compiler diagnostics on failure are passed through unmodified.

use crate::artifact::parse_bytecode;
use crate::{CompilerInterface, ContractArtifact, ContractError};
use alloy::json_abi::JsonAbi;
use async_trait::async_trait;
use issuer_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const DEFAULT_BINARY: &str = "solc";

#[derive(Deserialize)]
struct CombinedOutput {
	contracts: BTreeMap<String, CombinedContract>,
}

#[derive(Deserialize)]
struct CombinedContract {
	/// A JSON array, or the same array as a string in older solc releases.
	abi: serde_json::Value,
	#[serde(default)]
	bin: String,
}

/// Compiler backed by a local solc installation.
pub struct SolcCompiler {
	binary: String,
	contract: Option<String>,
	optimize: bool,
}

impl SolcCompiler {
	pub fn new(binary: impl Into<String>, contract: Option<String>, optimize: bool) -> Self {
		Self {
			binary: binary.into(),
			contract,
			optimize,
		}
	}
}

/// Picks the requested contract out of solc's combined JSON output.
///
/// Without an explicit `contract` the output must hold exactly one
/// deployable contract.
fn parse_combined_json(
	stdout: &str,
	contract: Option<&str>,
) -> Result<ContractArtifact, ContractError> {
	let output: CombinedOutput = serde_json::from_str(stdout)
		.map_err(|e| ContractError::Compilation(format!("Unexpected solc output: {}", e)))?;

	let short_name = |key: &str| key.rsplit(':').next().unwrap_or(key).to_string();

	let (key, compiled) = match contract {
		Some(wanted) => output
			.contracts
			.into_iter()
			.find(|(key, _)| short_name(key) == wanted)
			.ok_or_else(|| {
				ContractError::Compilation(format!("Contract {} not found in source", wanted))
			})?,
		None => {
			let mut deployable: Vec<_> = output
				.contracts
				.into_iter()
				.filter(|(_, c)| !c.bin.is_empty())
				.collect();
			match deployable.len() {
				0 => {
					return Err(ContractError::Compilation(
						"Source contains no deployable contract".to_string(),
					))
				}
				1 => deployable.remove(0),
				_ => {
					let names: Vec<String> = deployable.iter().map(|(k, _)| short_name(k)).collect();
					return Err(ContractError::Compilation(format!(
						"Source contains several contracts ({}); set `contract` to choose one",
						names.join(", ")
					)));
				}
			}
		}
	};

	let abi: JsonAbi = match compiled.abi {
		serde_json::Value::String(encoded) => serde_json::from_str(&encoded),
		other => serde_json::from_value(other),
	}
	.map_err(|e| ContractError::Compilation(format!("Unexpected ABI in solc output: {}", e)))?;

	let bytecode = parse_bytecode(&compiled.bin)?;
	Ok(ContractArtifact::new(short_name(&key), abi, bytecode))
}

/// Configuration schema for the solc compiler.
pub struct SolcCompilerSchema;

impl SolcCompilerSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for SolcCompilerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("binary", FieldType::String),
				Field::new("contract", FieldType::String),
				Field::new("optimize", FieldType::Boolean),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl CompilerInterface for SolcCompiler {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SolcCompilerSchema)
	}

	async fn compile(&self, source: &str) -> Result<ContractArtifact, ContractError> {
		let mut command = Command::new(&self.binary);
		command.arg("--combined-json").arg("abi,bin");
		if self.optimize {
			command.arg("--optimize");
		}
		command
			.arg("-")
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		let mut child = command.spawn().map_err(|e| {
			ContractError::Compilation(format!("Failed to run {}: {}", self.binary, e))
		})?;

		if let Some(mut stdin) = child.stdin.take() {
			stdin.write_all(source.as_bytes()).await.map_err(|e| {
				ContractError::Compilation(format!("Failed to pass source to solc: {}", e))
			})?;
		}

		let output = child
			.wait_with_output()
			.await
			.map_err(|e| ContractError::Compilation(format!("solc did not finish: {}", e)))?;

		if !output.status.success() {
			return Err(ContractError::Compilation(
				String::from_utf8_lossy(&output.stderr).trim().to_string(),
			));
		}

		parse_combined_json(
			&String::from_utf8_lossy(&output.stdout),
			self.contract.as_deref(),
		)
	}
}

/// Factory function to create a solc compiler from configuration.
///
/// Configuration parameters:
/// - `binary` (optional): path of the solc executable, default `solc`
/// - `contract` (optional): contract to select when the source has several
/// - `optimize` (optional): pass `--optimize`, default false
pub fn create_compiler(config: &toml::Value) -> Result<Box<dyn CompilerInterface>, ContractError> {
	SolcCompilerSchema::validate_config(config)
		.map_err(|e| ContractError::Compilation(format!("Invalid configuration: {}", e)))?;

	let binary = config
		.get("binary")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_BINARY);
	let contract = config
		.get("contract")
		.and_then(|v| v.as_str())
		.map(str::to_string);
	let optimize = config
		.get("optimize")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);

	Ok(Box::new(SolcCompiler::new(binary, contract, optimize)))
}

/// Registry for the solc compiler.
pub struct Registry;

impl issuer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "solc";
	type Factory = crate::CompilerFactory;

	fn factory() -> Self::Factory {
		create_compiler
	}
}

impl crate::CompilerRegistry for Registry {}
