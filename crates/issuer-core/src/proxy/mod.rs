//! Contract proxies.
//!
//! A proxy binds a deployed contract to the gateway and the lifecycle
//! manager: reads go straight to `eth_call`, writes become call intents and
//! run through the full transaction lifecycle.

mod token;

pub use token::TokenProxy;

use crate::lifecycle::{LifecycleManager, PendingTransaction, TransactionOutcome};
use crate::transaction::TransactionIntent;
use crate::IssuerError;
use alloy::dyn_abi::DynSolValue;
use issuer_contract::{coerce_args, decode_output, encode_call, resolve_function, DeployedContract};
use issuer_gateway::GatewayService;
use issuer_types::Address;
use std::sync::Arc;

#[derive(Clone)]
pub struct ContractProxy {
	contract: DeployedContract,
	gateway: GatewayService,
	lifecycle: Arc<LifecycleManager>,
}

impl ContractProxy {
	pub fn new(
		contract: DeployedContract,
		gateway: GatewayService,
		lifecycle: Arc<LifecycleManager>,
	) -> Self {
		Self {
			contract,
			gateway,
			lifecycle,
		}
	}

	pub fn address(&self) -> Address {
		self.contract.address
	}

	pub fn contract(&self) -> &DeployedContract {
		&self.contract
	}

	/// Calls a view function and decodes its return values.
	pub async fn read(
		&self,
		function: &str,
		args: &[DynSolValue],
	) -> Result<Vec<DynSolValue>, IssuerError> {
		let function = resolve_function(&self.contract.artifact.abi, function)?;
		let data = encode_call(function, args)?;
		let output = self.gateway.call(self.contract.address, data).await?;
		tracing::trace!(
			function = %function.name,
			output_len = output.len(),
			"Read contract"
		);
		Ok(decode_output(function, &output)?)
	}

	/// Sends a state-changing call and waits for its outcome.
	pub async fn write(
		&self,
		function: &str,
		args: Vec<DynSolValue>,
	) -> Result<TransactionOutcome, IssuerError> {
		self.lifecycle.submit(self.intent(function, args)).await
	}

	/// Broadcasts a state-changing call without waiting for it to be mined.
	pub async fn send(
		&self,
		function: &str,
		args: Vec<DynSolValue>,
	) -> Result<PendingTransaction, IssuerError> {
		self.lifecycle.broadcast(self.intent(function, args)).await
	}

	/// Converts textual arguments into ABI values for `function`.
	pub fn parse_args<S: AsRef<str>>(
		&self,
		function: &str,
		args: &[S],
	) -> Result<Vec<DynSolValue>, IssuerError> {
		let function = resolve_function(&self.contract.artifact.abi, function)?;
		Ok(coerce_args(&function.inputs, args)?)
	}

	fn intent(&self, function: &str, args: Vec<DynSolValue>) -> TransactionIntent {
		TransactionIntent::call(self.contract.clone(), function, args)
	}
}
