//! JSON-RPC gateway over HTTP using the Alloy provider.
//!
//! Every request is bounded by a per-call timeout that is independent of the
//! lifecycle manager's receipt timeout. JSON-RPC error responses become
//! `NodeRejected`; anything that prevented an answer becomes `Connectivity`.

use crate::{GatewayError, GatewayInterface};
use alloy::eips::BlockId;
use alloy::network::Ethereum;
use alloy::primitives::TxKind;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use issuer_types::{
	Address, Bytes, ConfigSchema, Field, FieldType, Schema, SignedTransaction, TransactionHash,
	TransactionReceipt, UnsignedTransaction, ValidationError,
};
use std::future::IntoFuture;
use std::time::Duration;

/// Default per-call timeout.
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Alloy-based HTTP gateway.
pub struct AlloyGateway {
	provider: RootProvider<Ethereum>,
	request_timeout: Duration,
}

impl AlloyGateway {
	pub fn new(rpc_url: &str, request_timeout: Duration) -> Result<Self, GatewayError> {
		let url: reqwest::Url = rpc_url
			.parse()
			.map_err(|e| GatewayError::Implementation(format!("Invalid RPC URL: {}", e)))?;

		Ok(Self {
			provider: RootProvider::<Ethereum>::new_http(url),
			request_timeout,
		})
	}

	/// Awaits an RPC request within the per-call timeout.
	async fn request<T, F>(&self, method: &str, request: F) -> Result<T, GatewayError>
	where
		F: IntoFuture<Output = Result<T, TransportError>>,
	{
		match tokio::time::timeout(self.request_timeout, request).await {
			Ok(result) => result.map_err(classify_error),
			Err(_) => Err(GatewayError::Connectivity(format!(
				"{} timed out after {}s",
				method,
				self.request_timeout.as_secs()
			))),
		}
	}
}

/// Splits transport failures from JSON-RPC error responses.
fn classify_error(err: TransportError) -> GatewayError {
	match err {
		RpcError::ErrorResp(payload) => GatewayError::NodeRejected(payload.message.to_string()),
		other => GatewayError::Connectivity(other.to_string()),
	}
}

/// Builds the `eth_call` request that replays a transaction.
fn replay_request(tx: &UnsignedTransaction) -> TransactionRequest {
	TransactionRequest {
		from: Some(tx.from),
		to: Some(match tx.to {
			Some(to) => TxKind::Call(to),
			None => TxKind::Create,
		}),
		gas: Some(tx.gas_limit),
		gas_price: Some(tx.gas_price),
		input: TransactionInput::new(tx.data.clone()),
		..Default::default()
	}
}

/// Configuration schema for the Alloy gateway.
pub struct AlloyGatewaySchema;

impl AlloyGatewaySchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for AlloyGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![Field::new("rpc_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("rpc_url must be an http(s) URL".to_string()),
				}
			})],
			// Optional fields
			vec![Field::new(
				"request_timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl GatewayInterface for AlloyGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyGatewaySchema)
	}

	async fn get_chain_id(&self) -> Result<u64, GatewayError> {
		self.request("eth_chainId", self.provider.get_chain_id())
			.await
	}

	async fn get_nonce(&self, address: Address) -> Result<u64, GatewayError> {
		self.request(
			"eth_getTransactionCount",
			self.provider.get_transaction_count(address).pending(),
		)
		.await
	}

	async fn get_gas_price(&self) -> Result<u128, GatewayError> {
		self.request("eth_gasPrice", self.provider.get_gas_price())
			.await
	}

	async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionHash, GatewayError> {
		let pending = self
			.request(
				"eth_sendRawTransaction",
				self.provider.send_raw_transaction(&tx.raw),
			)
			.await?;
		Ok(TransactionHash(*pending.tx_hash()))
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, GatewayError> {
		let receipt = self
			.request(
				"eth_getTransactionReceipt",
				self.provider.get_transaction_receipt(hash.0),
			)
			.await?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			transaction_hash: TransactionHash(receipt.transaction_hash),
			success: receipt.status(),
			contract_address: receipt.contract_address,
			block_number: receipt.block_number.unwrap_or(0),
			gas_used: receipt.gas_used,
		}))
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
		let request = TransactionRequest {
			to: Some(TxKind::Call(to)),
			input: TransactionInput::new(data),
			..Default::default()
		};
		self.request("eth_call", self.provider.call(request)).await
	}

	async fn revert_reason(
		&self,
		tx: &UnsignedTransaction,
		block_number: u64,
	) -> Result<Option<String>, GatewayError> {
		let replay = self
			.provider
			.call(replay_request(tx))
			.block(BlockId::number(block_number.saturating_sub(1)));

		match tokio::time::timeout(self.request_timeout, replay).await {
			Err(_) => Err(GatewayError::Connectivity(format!(
				"eth_call timed out after {}s",
				self.request_timeout.as_secs()
			))),
			// The replay succeeded against the earlier state; nothing to decode.
			Ok(Ok(_)) => Ok(None),
			Ok(Err(RpcError::ErrorResp(payload))) => Ok(payload
				.as_revert_data()
				.and_then(|data| alloy::sol_types::decode_revert_reason(&data))
				.or_else(|| {
					payload
						.message
						.strip_prefix("execution reverted: ")
						.map(str::to_string)
				})),
			Ok(Err(other)) => Err(classify_error(other)),
		}
	}
}

/// Factory function to create an HTTP gateway from configuration.
///
/// Configuration parameters:
/// - `rpc_url`: HTTP(S) endpoint of the node
/// - `request_timeout_seconds` (optional): per-call timeout, default 30
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	AlloyGatewaySchema::validate_config(config)
		.map_err(|e| GatewayError::Implementation(format!("Invalid configuration: {}", e)))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| GatewayError::Implementation("rpc_url is required".to_string()))?;

	let timeout_seconds = config
		.get("request_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);

	let gateway = AlloyGateway::new(rpc_url, Duration::from_secs(timeout_seconds))?;
	tracing::debug!(timeout_seconds, "Created HTTP gateway");
	Ok(Box::new(gateway))
}

/// Registry for the HTTP/Alloy gateway implementation.
pub struct Registry;

impl issuer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::GatewayFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl crate::GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_schema_requires_http_url() {
		let config: toml::Value = toml::from_str("rpc_url = \"ws://localhost:8546\"").unwrap();
		assert!(AlloyGatewaySchema::validate_config(&config).is_err());

		let config: toml::Value = toml::from_str("request_timeout_seconds = 5").unwrap();
		assert!(AlloyGatewaySchema::validate_config(&config).is_err());

		let config: toml::Value =
			toml::from_str("rpc_url = \"https://sepolia.example.org/v3/key\"").unwrap();
		assert!(AlloyGatewaySchema::validate_config(&config).is_ok());
	}

	#[test]
	fn test_factory_rejects_bad_timeout() {
		let config: toml::Value = toml::from_str(
			"rpc_url = \"http://localhost:8545\"\nrequest_timeout_seconds = 0",
		)
		.unwrap();
		let err = match create_gateway(&config) {
			Err(e) => e,
			Ok(_) => panic!("zero timeout accepted"),
		};
		assert!(matches!(err, GatewayError::Implementation(_)));
	}

	#[test]
	fn test_replay_request_for_deployment() {
		let tx = UnsignedTransaction {
			from: Address::repeat_byte(0x11),
			to: None,
			nonce: 0,
			gas_limit: 3_000_000,
			gas_price: 10_000_000_000,
			chain_id: 1,
			data: Bytes::from_static(&[0x60, 0x80]),
		};
		let request = replay_request(&tx);
		assert_eq!(request.to, Some(TxKind::Create));
		assert_eq!(request.from, Some(tx.from));
		assert_eq!(request.gas, Some(3_000_000));
	}

	#[tokio::test]
	async fn test_unreachable_node_is_connectivity_error() {
		// Nothing listens on port 1.
		let gateway = AlloyGateway::new("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
		let err = gateway.get_chain_id().await.unwrap_err();
		assert!(err.is_connectivity(), "unexpected error: {}", err);
	}
}
