//! Builder pattern for constructing the issuer.
//!
//! Turns a `Config` plus factory functions for each pluggable component
//! (account, gateway, compiler) into a ready `Issuer`. Every configured
//! implementation with a known factory is constructed, which validates its
//! section; the `primary` one of each component is used.

use crate::engine::{event_bus::EventBus, Issuer};
use issuer_account::{AccountError, AccountFactory, AccountInterface, AccountService};
use issuer_config::{Config, ImplementationConfig};
use issuer_contract::{
	CompilerFactory, CompilerInterface, CompilerService, ContractError,
};
use issuer_gateway::{GatewayError, GatewayFactory, GatewayInterface, GatewayService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during issuer construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for each component, keyed by implementation name.
pub struct IssuerFactories<AF, GF, CF> {
	pub account_factories: HashMap<String, AF>,
	pub gateway_factories: HashMap<String, GF>,
	pub compiler_factories: HashMap<String, CF>,
}

/// Factories for every implementation shipped with the workspace.
pub fn default_factories() -> IssuerFactories<AccountFactory, GatewayFactory, CompilerFactory> {
	fn collect<F>(implementations: Vec<(&'static str, F)>) -> HashMap<String, F> {
		implementations
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect()
	}

	IssuerFactories {
		account_factories: collect(issuer_account::get_all_implementations()),
		gateway_factories: collect(issuer_gateway::get_all_implementations()),
		compiler_factories: collect(issuer_contract::get_all_implementations()),
	}
}

/// Creates every configured implementation of one component and returns the
/// primary one.
fn load_primary<F, T, E>(
	component: &str,
	section: &ImplementationConfig,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	F: Fn(&toml::Value) -> Result<T, E>,
	E: Display,
{
	let mut implementations = HashMap::new();
	for (name, config) in &section.implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = &section.primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				implementations.insert(name.clone(), implementation);
			}
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			}
		}
	}

	implementations.remove(&section.primary).ok_or_else(|| {
		let mut available: Vec<_> = factories.keys().cloned().collect();
		available.sort();
		BuilderError::MissingComponent(format!(
			"Primary {} '{}' is not available. Available: [{}]",
			component,
			section.primary,
			available.join(", ")
		))
	})
}

/// Builder for constructing an `Issuer` with pluggable implementations.
pub struct IssuerBuilder {
	config: Config,
}

impl IssuerBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the issuer using factories for each component type.
	pub async fn build<AF, GF, CF>(
		self,
		factories: IssuerFactories<AF, GF, CF>,
	) -> Result<Issuer, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		GF: Fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>,
		CF: Fn(&toml::Value) -> Result<Box<dyn CompilerInterface>, ContractError>,
	{
		let account = load_primary(
			"account",
			&self.config.account,
			&factories.account_factories,
		)?;
		let account = Arc::new(AccountService::new(account));

		// Fetch the issuer address once during initialization
		let address = account.get_address().await.map_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get issuer address");
			BuilderError::Config(format!("Failed to get issuer address: {}", e))
		})?;

		let gateway = load_primary(
			"gateway",
			&self.config.gateway,
			&factories.gateway_factories,
		)?;
		let gateway = GatewayService::new(gateway);

		let compiler = load_primary(
			"compiler",
			&self.config.compiler,
			&factories.compiler_factories,
		)?;
		let compiler = Arc::new(CompilerService::new(compiler));

		Ok(Issuer::new(
			self.config,
			account,
			address,
			gateway,
			compiler,
			EventBus::default(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{OWNER, TEST_PRIVATE_KEY};

	fn config(extra: &str) -> Config {
		format!(
			r#"
[network]
chain_id = 31337

[account]
primary = "local"
[account.implementations.local]
private_key = "{}"

[gateway]
primary = "mock"
[gateway.implementations.mock]

[compiler]
primary = "solc"
[compiler.implementations.solc]
{}
"#,
			TEST_PRIVATE_KEY, extra
		)
		.parse()
		.unwrap()
	}

	#[tokio::test]
	async fn test_build_with_default_factories() {
		let issuer = IssuerBuilder::new(config(""))
			.build(default_factories())
			.await
			.unwrap();

		assert_eq!(issuer.address(), OWNER);
		issuer.initialize().await.unwrap();
	}

	#[tokio::test]
	async fn test_unknown_primary_lists_available() {
		let mut config = config("");
		config.gateway.primary = "ipc".to_string();
		config
			.gateway
			.implementations
			.insert("ipc".to_string(), toml::Value::Table(Default::default()));

		let err = match IssuerBuilder::new(config).build(default_factories()).await {
			Ok(_) => panic!("expected an error"),
			Err(e) => e,
		};
		assert!(matches!(err, BuilderError::MissingComponent(_)));
		assert!(err.to_string().contains("evm_alloy, mock"));
	}

	#[tokio::test]
	async fn test_invalid_implementation_config_fails() {
		let mut config = config("");
		config.account.implementations.insert(
			"local".to_string(),
			toml::Value::Table(toml::map::Map::from_iter([(
				"private_key".to_string(),
				toml::Value::String("0x1234".to_string()),
			)])),
		);

		let err = match IssuerBuilder::new(config).build(default_factories()).await {
			Ok(_) => panic!("expected an error"),
			Err(e) => e,
		};
		assert!(matches!(err, BuilderError::Config(_)));
		assert!(err.to_string().contains("account"));
		assert!(!err.to_string().contains("0x1234"));
	}
}
