//! Configuration module for the token issuer.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, which is how the private key,
//! wallet address and node URL are supplied without writing them to disk.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["secrets.toml", "gas.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)
//!
//! ## Layout
//!
//! ```toml
//! [network]
//! chain_id = 11155111
//!
//! [account]
//! primary = "local"
//! [account.implementations.local]
//! private_key = "${PRIVATE_KEY}"
//! address = "${WALLET_ADDRESS:-}"
//!
//! [gateway]
//! primary = "evm_alloy"
//! [gateway.implementations.evm_alloy]
//! rpc_url = "${RPC_URL}"
//!
//! [compiler]
//! primary = "solc"
//! [compiler.implementations.solc]
//!
//! [gas]
//! price = { policy = "fixed", gwei = 10 }
//! deploy_limit = 3000000
//! call_limit = 100000
//!
//! [lifecycle]
//! max_nonce_attempts = 3
//! poll_interval_ms = 1000
//! receipt_timeout_seconds = 120
//!
//! [token]
//! initial_supply = 1000000
//! # address = "0x..." reuses an existing deployment
//!
//! [[token.transfers]]
//! to = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
//! amount = "250"
//! ```

mod loader;

use issuer_types::{parse_token_amount, Address, ChainContext, GasLimits, GasPricePolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering echoes the whole input,
		// which may contain resolved secrets.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the issuer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Target chain.
	pub network: NetworkConfig,
	/// Signer implementations.
	pub account: ImplementationConfig,
	/// RPC gateway implementations.
	pub gateway: ImplementationConfig,
	/// Compiler implementations.
	pub compiler: ImplementationConfig,
	/// Gas price policy and limits.
	#[serde(default)]
	pub gas: GasConfig,
	/// Broadcast retry and receipt polling settings.
	#[serde(default)]
	pub lifecycle: LifecycleConfig,
	/// Parameters of the bundled token.
	#[serde(default)]
	pub token: TokenConfig,
}

/// Target chain settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// EIP-155 chain id. The node must report the same value.
	pub chain_id: u64,
}

/// A pluggable component: the implementation in use plus the configuration
/// sections of all known implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImplementationConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of implementation names to their raw configuration.
	pub implementations: HashMap<String, toml::Value>,
}

impl ImplementationConfig {
	/// Returns the configuration section of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}

	fn validate(&self, section: &str) -> Result<(), ConfigError> {
		if self.primary.is_empty() {
			return Err(ConfigError::Validation(format!(
				"{} primary implementation cannot be empty",
				section
			)));
		}
		if !self.implementations.contains_key(&self.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary {} '{}' not found in implementations",
				section, self.primary
			)));
		}
		Ok(())
	}
}

/// Gas settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GasConfig {
	/// Gas price policy. Defaults to a fixed 10 gwei.
	#[serde(default)]
	pub price: GasPricePolicy,
	/// Gas ceilings per operation class.
	#[serde(flatten)]
	pub limits: GasLimits,
}

/// Lifecycle manager settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifecycleConfig {
	/// Broadcast attempts allowed when the node reports a nonce conflict.
	#[serde(default = "default_max_nonce_attempts")]
	pub max_nonce_attempts: u32,
	/// Interval between receipt polls.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// How long to wait for a receipt before reporting the transaction stuck.
	#[serde(default = "default_receipt_timeout_seconds")]
	pub receipt_timeout_seconds: u64,
}

fn default_max_nonce_attempts() -> u32 {
	3
}

fn default_poll_interval_ms() -> u64 {
	1000
}

/// Matches the 120 second receipt wait of common Ethereum client libraries.
fn default_receipt_timeout_seconds() -> u64 {
	120
}

impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			max_nonce_attempts: default_max_nonce_attempts(),
			poll_interval_ms: default_poll_interval_ms(),
			receipt_timeout_seconds: default_receipt_timeout_seconds(),
		}
	}
}

impl LifecycleConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn receipt_timeout(&self) -> Duration {
		Duration::from_secs(self.receipt_timeout_seconds)
	}
}

/// Parameters of the bundled token contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	/// Whole tokens minted to the deployer; the contract scales by its decimals.
	#[serde(default = "default_initial_supply")]
	pub initial_supply: u64,
	/// Existing deployment to use instead of deploying a new token.
	#[serde(default)]
	pub address: Option<Address>,
	/// Transfers sent from the issuer once the token is available.
	#[serde(default)]
	pub transfers: Vec<TransferConfig>,
}

fn default_initial_supply() -> u64 {
	1_000_000
}

impl Default for TokenConfig {
	fn default() -> Self {
		Self {
			initial_supply: default_initial_supply(),
			address: None,
			transfers: Vec::new(),
		}
	}
}

/// One token transfer from the issuer's account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferConfig {
	/// Recipient.
	pub to: Address,
	/// Amount in whole tokens; decimal fractions such as "12.5" are allowed.
	pub amount: String,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				}
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;
		loader.load_config(file_name).await
	}

	/// Builds a configuration from an already env-resolved TOML value.
	pub(crate) fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
		let config: Config = value.try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// The immutable chain context derived from this configuration.
	pub fn chain_context(&self) -> ChainContext {
		ChainContext::new(self.network.chain_id, self.gas.price, self.gas.limits)
	}

	/// Validates cross-field constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation(
				"network.chain_id must be greater than 0".into(),
			));
		}

		self.account.validate("account")?;
		self.gateway.validate("gateway")?;
		self.compiler.validate("compiler")?;

		if self.gas.limits.deploy_limit == 0 || self.gas.limits.call_limit == 0 {
			return Err(ConfigError::Validation(
				"gas limits must be greater than 0".into(),
			));
		}
		if let GasPricePolicy::Oracle {
			multiplier_percent, ..
		} = self.gas.price
		{
			if multiplier_percent == 0 || multiplier_percent > 1000 {
				return Err(ConfigError::Validation(format!(
					"gas.price.multiplier_percent must be within 1..=1000, got {}",
					multiplier_percent
				)));
			}
		}

		if !(1..=10).contains(&self.lifecycle.max_nonce_attempts) {
			return Err(ConfigError::Validation(
				"lifecycle.max_nonce_attempts must be within 1..=10".into(),
			));
		}
		if self.lifecycle.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"lifecycle.poll_interval_ms must be greater than 0".into(),
			));
		}
		if self.lifecycle.receipt_timeout_seconds == 0
			|| self.lifecycle.receipt_timeout_seconds > 3600
		{
			return Err(ConfigError::Validation(
				"lifecycle.receipt_timeout_seconds must be within 1..=3600".into(),
			));
		}

		if self.token.initial_supply == 0 {
			return Err(ConfigError::Validation(
				"token.initial_supply must be greater than 0".into(),
			));
		}
		for (index, transfer) in self.token.transfers.iter().enumerate() {
			// Token decimals are unknown here; 18 bounds the fraction.
			if parse_token_amount(&transfer.amount, 18).is_none() {
				return Err(ConfigError::Validation(format!(
					"token.transfers[{}].amount '{}' is not a decimal amount",
					index, transfer.amount
				)));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let value: toml::Value = toml::from_str(&resolved)?;
		Config::from_value(value)
	}
}
