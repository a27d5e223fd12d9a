//! Turns intents into unsigned transactions.
//!
//! Encoding happens once per operation, before any nonce is reserved, so
//! malformed arguments fail without touching the signer or the node. Nonce
//! and gas price are fetched fresh for every attempt.

use super::TransactionIntent;
use crate::nonce::NonceSlot;
use crate::IssuerError;
use issuer_contract::{encode_call, encode_deployment, resolve_function};
use issuer_gateway::GatewayService;
use issuer_types::{Address, Bytes, ChainContext, TransactionKind, UnsignedTransaction};

/// Intent data encoded for the chain: recipient, calldata and gas ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedIntent {
	pub to: Option<Address>,
	pub data: Bytes,
	pub gas_limit: u64,
}

impl EncodedIntent {
	pub fn kind(&self) -> TransactionKind {
		match self.to {
			Some(_) => TransactionKind::Call,
			None => TransactionKind::Deploy,
		}
	}
}

pub struct TransactionBuilder {
	gateway: GatewayService,
	context: ChainContext,
}

impl TransactionBuilder {
	pub fn new(gateway: GatewayService, context: ChainContext) -> Self {
		Self { gateway, context }
	}

	pub fn context(&self) -> &ChainContext {
		&self.context
	}

	/// Encodes calldata and picks the gas ceiling for an intent.
	pub fn encode(&self, intent: &TransactionIntent) -> Result<EncodedIntent, IssuerError> {
		let limits = &self.context.gas_limits;
		match intent {
			TransactionIntent::Deploy {
				artifact,
				constructor_args,
				gas_limit,
			} => Ok(EncodedIntent {
				to: None,
				data: encode_deployment(artifact, constructor_args)?,
				gas_limit: gas_limit.unwrap_or(limits.deploy_limit),
			}),
			TransactionIntent::Call {
				contract,
				function,
				args,
				gas_limit,
			} => {
				let function = resolve_function(&contract.artifact.abi, function)?;
				Ok(EncodedIntent {
					to: Some(contract.address),
					data: encode_call(function, args)?,
					gas_limit: gas_limit.unwrap_or(limits.call_limit),
				})
			}
		}
	}

	/// Gas price in wei under the configured policy.
	pub async fn gas_price(&self) -> Result<u128, IssuerError> {
		let policy = self.context.gas_price;
		let quote = if policy.requires_quote() {
			Some(self.gateway.get_gas_price().await?)
		} else {
			None
		};
		policy
			.resolve(quote)
			.ok_or_else(|| IssuerError::Config("gas price policy produced no price".to_string()))
	}

	/// Builds the transaction for one attempt.
	///
	/// The nonce is `max(chain pending count, last issued + 1)`; the caller
	/// holds `slot` and decides whether the nonce is committed.
	pub async fn build(
		&self,
		encoded: &EncodedIntent,
		from: Address,
		slot: &NonceSlot,
	) -> Result<UnsignedTransaction, IssuerError> {
		let chain_nonce = self.gateway.get_nonce(from).await?;
		let nonce = slot.reserve(chain_nonce);
		if nonce != chain_nonce {
			tracing::debug!(chain_nonce, nonce, "Node nonce is behind local allocation");
		}

		Ok(UnsignedTransaction {
			from,
			to: encoded.to,
			nonce,
			gas_limit: encoded.gas_limit,
			gas_price: self.gas_price().await?,
			chain_id: self.context.chain_id,
			data: encoded.data.clone(),
		})
	}
}
