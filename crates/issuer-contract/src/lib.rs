//! Contract module for the token issuer.
//!
//! This module owns everything that turns contract source into deployable
//! bytes and back: compiled artifacts, ABI encoding of constructor and
//! function arguments, decoding of call results, and the compiler
//! implementations that produce artifacts. It also bundles the MemeCoin token
//! source and ABI.

use async_trait::async_trait;
use issuer_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

pub mod abi;
pub mod artifact;
pub mod token;

/// Re-export implementations
pub mod implementations {
	pub mod artifact;
	pub mod solc;
}

pub use abi::{coerce_args, decode_output, encode_call, encode_deployment, resolve_function};
pub use artifact::{ContractArtifact, DeployedContract};

/// Errors that can occur during contract operations.
#[derive(Debug, Error)]
pub enum ContractError {
	/// The compiler failed; carries its diagnostics unmodified.
	#[error("Compilation failed: {0}")]
	Compilation(String),
	/// Arguments do not match the ABI, or the function is unknown or ambiguous.
	#[error("Encoding error: {0}")]
	Encoding(String),
	/// A compiled artifact could not be read or is malformed.
	#[error("Artifact error: {0}")]
	Artifact(String),
}

/// Trait defining the interface for compiler implementations.
#[async_trait]
pub trait CompilerInterface: Send + Sync {
	/// Returns the configuration schema for this compiler implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Compiles contract source into an artifact.
	async fn compile(&self, source: &str) -> Result<ContractArtifact, ContractError>;
}

/// Type alias for compiler factory functions.
pub type CompilerFactory = fn(&toml::Value) -> Result<Box<dyn CompilerInterface>, ContractError>;

/// Registry trait for compiler implementations.
pub trait CompilerRegistry: ImplementationRegistry<Factory = CompilerFactory> {}

/// Get all registered compiler implementations.
///
/// Returns a vector of (name, factory) tuples for all available compiler implementations.
pub fn get_all_implementations() -> Vec<(&'static str, CompilerFactory)> {
	use implementations::{artifact, solc};

	vec![
		(solc::Registry::NAME, solc::Registry::factory()),
		(artifact::Registry::NAME, artifact::Registry::factory()),
	]
}

/// Service wrapping the configured compiler implementation.
pub struct CompilerService {
	implementation: Box<dyn CompilerInterface>,
}

impl CompilerService {
	pub fn new(implementation: Box<dyn CompilerInterface>) -> Self {
		Self { implementation }
	}

	/// Compiles contract source into an artifact.
	pub async fn compile(&self, source: &str) -> Result<ContractArtifact, ContractError> {
		match self.implementation.compile(source).await {
			Ok(artifact) => {
				tracing::info!(
					contract = %artifact.name,
					bytecode_len = artifact.bytecode.len(),
					"Compiled contract"
				);
				Ok(artifact)
			}
			Err(e) => {
				tracing::error!(error = %e, "Compilation failed");
				Err(e)
			}
		}
	}
}
