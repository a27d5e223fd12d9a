//! The issuer facade.
//!
//! `Issuer` ties the configured signer, gateway and compiler to one
//! lifecycle manager and exposes the operations a front-end needs: compile,
//! deploy, attach to an existing token, and observe lifecycle events.

pub mod event_bus;
pub mod lifecycle;

use crate::lifecycle::{DeploymentOutcome, LifecycleManager, LifecycleSettings};
use crate::proxy::{ContractProxy, TokenProxy};
use crate::IssuerError;
use alloy::dyn_abi::DynSolValue;
use issuer_account::AccountService;
use issuer_config::Config;
use issuer_contract::token::{memecoin_abi, MEMECOIN_SOURCE, TOKEN_CONTRACT_NAME};
use issuer_contract::{CompilerService, ContractArtifact, DeployedContract};
use issuer_gateway::GatewayService;
use issuer_types::{Address, Bytes, LifecycleEvent, U256};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

/// Token issuance orchestrator.
pub struct Issuer {
	/// Issuer configuration.
	pub(crate) config: Config,
	/// Address of the signing account.
	pub(crate) address: Address,
	pub(crate) gateway: GatewayService,
	pub(crate) compiler: Arc<CompilerService>,
	pub(crate) lifecycle: Arc<LifecycleManager>,
	/// Event bus carrying lifecycle events.
	pub(crate) event_bus: event_bus::EventBus,
}

impl Issuer {
	/// Creates an issuer from already constructed services.
	pub fn new(
		config: Config,
		account: Arc<AccountService>,
		address: Address,
		gateway: GatewayService,
		compiler: Arc<CompilerService>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let lifecycle = Arc::new(LifecycleManager::new(
			account,
			gateway.clone(),
			config.chain_context(),
			event_bus.clone(),
			LifecycleSettings::from(&config.lifecycle),
		));

		Self {
			config,
			address,
			gateway,
			compiler,
			lifecycle,
			event_bus,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Address every transaction is sent from.
	pub fn address(&self) -> Address {
		self.address
	}

	pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
		&self.lifecycle
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Subscribes to lifecycle events of every operation.
	pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.event_bus.subscribe()
	}

	/// Compiles contract source with the configured compiler.
	pub async fn compile(&self, source: &str) -> Result<Arc<ContractArtifact>, IssuerError> {
		Ok(Arc::new(self.compiler.compile(source).await?))
	}

	/// Compiles the bundled MemeCoin token.
	pub async fn compile_token(&self) -> Result<Arc<ContractArtifact>, IssuerError> {
		self.compile(MEMECOIN_SOURCE).await
	}

	/// Deploys a compiled contract and waits for the outcome.
	pub async fn deploy(
		&self,
		artifact: Arc<ContractArtifact>,
		constructor_args: Vec<DynSolValue>,
	) -> Result<DeploymentOutcome, IssuerError> {
		self.lifecycle.deploy(artifact, constructor_args).await
	}

	/// Compiles and deploys MemeCoin minting `initial_supply` whole tokens to
	/// the issuer's account.
	#[instrument(skip_all, fields(initial_supply = initial_supply))]
	pub async fn deploy_token(&self, initial_supply: u64) -> Result<DeploymentOutcome, IssuerError> {
		if initial_supply == 0 {
			return Err(IssuerError::Encoding(
				"initial supply must be greater than 0".to_string(),
			));
		}
		let artifact = self.compile_token().await?;
		self.deploy(
			artifact,
			vec![DynSolValue::Uint(U256::from(initial_supply), 256)],
		)
		.await
	}

	/// Deploys MemeCoin with the configured initial supply.
	pub async fn deploy_configured_token(&self) -> Result<DeploymentOutcome, IssuerError> {
		self.deploy_token(self.config.token.initial_supply).await
	}

	/// Proxy for any deployed contract.
	pub fn contract(&self, deployed: DeployedContract) -> ContractProxy {
		ContractProxy::new(deployed, self.gateway.clone(), self.lifecycle.clone())
	}

	/// Token proxy for a deployed MemeCoin.
	pub fn token(&self, deployed: DeployedContract) -> TokenProxy {
		TokenProxy::new(self.contract(deployed))
	}

	/// Token proxy for a MemeCoin deployed earlier, using the bundled ABI.
	pub fn attach_token(&self, address: Address) -> Result<TokenProxy, IssuerError> {
		let artifact = ContractArtifact::new(TOKEN_CONTRACT_NAME, memecoin_abi()?, Bytes::new());
		Ok(self.token(DeployedContract::new(address, Arc::new(artifact))))
	}
}
