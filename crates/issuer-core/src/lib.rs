//! Core orchestration for the token issuer.
//!
//! This crate drives contract deployments and calls through their full
//! transaction lifecycle: encoding, nonce allocation, signing, broadcast,
//! nonce-conflict retries and receipt polling. It publishes every state change
//! as a `LifecycleEvent` and exposes the result through the `Issuer` facade
//! and typed contract proxies.

pub mod builder;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod nonce;
pub mod proxy;
pub mod transaction;

pub use builder::{default_factories, BuilderError, IssuerBuilder, IssuerFactories};
pub use engine::{event_bus::EventBus, Issuer};
pub use error::{ErrorKind, IssuerError};
pub use lifecycle::{
	DeploymentOutcome, LifecycleManager, LifecycleSettings, PendingTransaction,
	TransactionOutcome,
};
pub use proxy::{ContractProxy, TokenProxy};
pub use transaction::{TransactionBuilder, TransactionIntent};

#[cfg(test)]
pub(crate) mod test_support {
	use crate::engine::event_bus::EventBus;
	use crate::lifecycle::{LifecycleManager, LifecycleSettings};
	use crate::transaction::TransactionIntent;
	use crate::Issuer;
	use alloy::dyn_abi::DynSolValue;
	use alloy::primitives::address;
	use async_trait::async_trait;
	use issuer_account::implementations::local::LocalAccount;
	use issuer_account::{AccountError, AccountInterface, AccountService};
	use issuer_config::Config;
	use issuer_contract::token::{memecoin_abi, TOKEN_CONTRACT_NAME};
	use issuer_contract::{
		CompilerInterface, CompilerService, ContractArtifact, ContractError, DeployedContract,
	};
	use issuer_gateway::implementations::mock::MockGateway;
	use issuer_gateway::GatewayService;
	use issuer_types::{
		Address, Bytes, ChainContext, ConfigSchema, GasLimits, GasPricePolicy, PrivateCredential,
		SignedTransaction, UnsignedTransaction, ValidationError, U256,
	};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	/// First development account of anvil and hardhat.
	pub const TEST_PRIVATE_KEY: &str =
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	pub const OWNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

	/// MemeCoin ABI with placeholder creation code; the mock node treats any
	/// deployment as the token constructor.
	pub fn memecoin_artifact() -> Arc<ContractArtifact> {
		Arc::new(ContractArtifact::new(
			TOKEN_CONTRACT_NAME,
			memecoin_abi().unwrap(),
			Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]),
		))
	}

	pub fn chain_context() -> ChainContext {
		ChainContext::new(31337, GasPricePolicy::default(), GasLimits::default())
	}

	fn local_account() -> LocalAccount {
		LocalAccount::new(&PrivateCredential::from(TEST_PRIVATE_KEY)).unwrap()
	}

	/// Lifecycle manager signing with the test key against `node`.
	pub fn lifecycle(node: &MockGateway) -> (LifecycleManager, EventBus) {
		let bus = EventBus::default();
		let manager = LifecycleManager::new(
			Arc::new(AccountService::new(Box::new(local_account()))),
			GatewayService::new(Box::new(node.clone())),
			chain_context(),
			bus.clone(),
			LifecycleSettings::default(),
		);
		(manager, bus)
	}

	pub fn transfer_intent(token: &DeployedContract, to: Address, amount: U256) -> TransactionIntent {
		TransactionIntent::call(
			token.clone(),
			"transfer",
			vec![DynSolValue::Address(to), DynSolValue::Uint(amount, 256)],
		)
	}

	/// Deploys the token with `supply` whole tokens and returns it.
	pub async fn deploy_token(manager: &LifecycleManager, supply: u64) -> DeployedContract {
		manager
			.deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(supply), 256)],
			)
			.await
			.unwrap()
			.contract()
			.cloned()
			.unwrap()
	}

	struct NoConfig;

	impl ConfigSchema for NoConfig {
		fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
			Ok(())
		}
	}

	/// Compiler returning the placeholder MemeCoin artifact.
	struct StaticCompiler;

	#[async_trait]
	impl CompilerInterface for StaticCompiler {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoConfig)
		}

		async fn compile(&self, _source: &str) -> Result<ContractArtifact, ContractError> {
			Ok(memecoin_artifact().as_ref().clone())
		}
	}

	/// Issuer wired to `node`, the test key and the placeholder compiler.
	pub fn issuer(node: &MockGateway) -> Issuer {
		let config: Config = format!(
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
"#,
			TEST_PRIVATE_KEY
		)
		.parse()
		.unwrap();

		Issuer::new(
			config,
			Arc::new(AccountService::new(Box::new(local_account()))),
			OWNER,
			GatewayService::new(Box::new(node.clone())),
			Arc::new(CompilerService::new(Box::new(StaticCompiler))),
			EventBus::default(),
		)
	}

	/// Local account that counts signatures.
	#[derive(Clone)]
	pub struct CountingAccount {
		inner: Arc<LocalAccount>,
		signatures: Arc<AtomicUsize>,
	}

	impl CountingAccount {
		pub fn new() -> Self {
			Self {
				inner: Arc::new(local_account()),
				signatures: Arc::new(AtomicUsize::new(0)),
			}
		}

		pub fn signatures(&self) -> usize {
			self.signatures.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl AccountInterface for CountingAccount {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.inner.config_schema()
		}

		async fn address(&self) -> Result<Address, AccountError> {
			self.inner.address().await
		}

		async fn sign_transaction(
			&self,
			tx: &UnsignedTransaction,
		) -> Result<SignedTransaction, AccountError> {
			self.signatures.fetch_add(1, Ordering::SeqCst);
			self.inner.sign_transaction(tx).await
		}
	}
}
