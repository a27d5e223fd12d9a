//! Compiler implementation that serves a precompiled JSON artifact.
//!
//! Used where no solc installation is available. The source passed to
//! `compile` is not inspected; the configured artifact is returned as is.

use crate::{CompilerInterface, ContractArtifact, ContractError};
use async_trait::async_trait;
use issuer_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::path::PathBuf;

/// Compiler that loads `abi` and `bytecode` from a JSON file.
pub struct ArtifactCompiler {
	path: PathBuf,
	name: Option<String>,
}

impl ArtifactCompiler {
	pub fn new(path: impl Into<PathBuf>, name: Option<String>) -> Self {
		Self {
			path: path.into(),
			name,
		}
	}

	fn fallback_name(&self) -> String {
		self.name.clone().unwrap_or_else(|| {
			self.path
				.file_stem()
				.map(|stem| stem.to_string_lossy().into_owned())
				.unwrap_or_else(|| "Contract".to_string())
		})
	}
}

/// Configuration schema for the artifact compiler.
pub struct ArtifactCompilerSchema;

impl ArtifactCompilerSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for ArtifactCompilerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("path cannot be empty".to_string()),
				}
			})],
			vec![Field::new("name", FieldType::String)],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl CompilerInterface for ArtifactCompiler {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(ArtifactCompilerSchema)
	}

	async fn compile(&self, _source: &str) -> Result<ContractArtifact, ContractError> {
		let json = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
			ContractError::Artifact(format!("Cannot read {}: {}", self.path.display(), e))
		})?;
		tracing::debug!(path = %self.path.display(), "Loaded precompiled artifact");
		ContractArtifact::from_json(&json, &self.fallback_name())
	}
}

/// Factory function to create an artifact compiler from configuration.
///
/// Configuration parameters:
/// - `path`: JSON file with `abi` and `bytecode`
/// - `name` (optional): contract name when the file carries none
pub fn create_compiler(config: &toml::Value) -> Result<Box<dyn CompilerInterface>, ContractError> {
	ArtifactCompilerSchema::validate_config(config)
		.map_err(|e| ContractError::Artifact(format!("Invalid configuration: {}", e)))?;

	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ContractError::Artifact("path is required".to_string()))?;
	let name = config
		.get("name")
		.and_then(|v| v.as_str())
		.map(str::to_string);

	Ok(Box::new(ArtifactCompiler::new(path, name)))
}

/// Registry for the artifact compiler.
pub struct Registry;

impl issuer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "artifact";
	type Factory = crate::CompilerFactory;

	fn factory() -> Self::Factory {
		create_compiler
	}
}

impl crate::CompilerRegistry for Registry {}
