//! In-memory simulated node.
//!
//! `MockGateway` executes transactions the moment they are broadcast, enforces
//! account nonces the way a real node does and keeps an ERC-20 ledger for
//! every token it deploys, so a deploy followed by transfers and balance
//! queries behaves like the bundled MemeCoin contract. Scripting hooks let a
//! caller simulate stale nonce readings, injected node errors, slow or missing
//! receipts and an unreachable endpoint.
//!
//! Clones share the same simulated node.

use crate::{GatewayError, GatewayInterface};
use alloy::primitives::B256;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use issuer_types::{
	Address, Bytes, ConfigSchema, Field, FieldType, Schema, SignedTransaction, TransactionHash,
	TransactionReceipt, UnsignedTransaction, ValidationError, U256, WEI_PER_GWEI,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
const DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
const TOTAL_SUPPLY: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd];
const NAME: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];
const SYMBOL: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];

const TOKEN_NAME: &str = "MemeCoin";
const TOKEN_SYMBOL: &str = "MEME";
const TOKEN_DECIMALS: u8 = 18;

/// Default chain id of the simulated node, matching local development nodes.
pub const DEFAULT_CHAIN_ID: u64 = 31337;

#[derive(Debug, Default)]
struct TokenLedger {
	balances: HashMap<Address, U256>,
	total_supply: U256,
}

#[derive(Debug)]
struct MinedTransaction {
	receipt: TransactionReceipt,
	/// Polls still answered with `None` before the receipt becomes visible.
	hidden_polls: u32,
}

/// Effect of executing one transaction.
struct Execution {
	success: bool,
	contract_address: Option<Address>,
	revert_reason: Option<String>,
}

impl Execution {
	fn ok() -> Self {
		Self {
			success: true,
			contract_address: None,
			revert_reason: None,
		}
	}

	fn revert(reason: Option<&str>) -> Self {
		Self {
			success: false,
			contract_address: None,
			revert_reason: reason.map(str::to_string),
		}
	}
}

#[derive(Debug)]
struct MockNode {
	chain_id: u64,
	gas_price: u128,
	block_number: u64,
	nonces: HashMap<Address, u64>,
	transactions: HashMap<B256, MinedTransaction>,
	revert_reasons: HashMap<(Address, u64), String>,
	tokens: HashMap<Address, TokenLedger>,
	broadcast_errors: VecDeque<GatewayError>,
	receipt_errors: VecDeque<GatewayError>,
	nonce_readings: VecDeque<u64>,
	receipt_delay: u32,
	withhold_receipts: bool,
	unreachable: bool,
	broadcasts: Vec<SignedTransaction>,
	receipt_polls: u32,
}

impl MockNode {
	fn new(chain_id: u64) -> Self {
		Self {
			chain_id,
			gas_price: 10 * WEI_PER_GWEI,
			block_number: 0,
			nonces: HashMap::new(),
			transactions: HashMap::new(),
			revert_reasons: HashMap::new(),
			tokens: HashMap::new(),
			broadcast_errors: VecDeque::new(),
			receipt_errors: VecDeque::new(),
			nonce_readings: VecDeque::new(),
			receipt_delay: 0,
			withhold_receipts: false,
			unreachable: false,
			broadcasts: Vec::new(),
			receipt_polls: 0,
		}
	}

	fn ensure_reachable(&self) -> Result<(), GatewayError> {
		if self.unreachable {
			return Err(GatewayError::Connectivity(
				"connection refused by simulated node".to_string(),
			));
		}
		Ok(())
	}

	fn execute(&mut self, tx: &UnsignedTransaction) -> Execution {
		match tx.to {
			None => self.deploy_token(tx),
			Some(to) => match self.tokens.get_mut(&to) {
				Some(ledger) => execute_token_call(ledger, tx.from, &tx.data),
				// Plain value-less call to an account without code.
				None => Execution::ok(),
			},
		}
	}

	/// Treats every deployment as the MemeCoin constructor: the trailing word
	/// of the init code is `initialSupply` in whole tokens.
	fn deploy_token(&mut self, tx: &UnsignedTransaction) -> Execution {
		let initial_supply = tx
			.data
			.len()
			.checked_sub(32)
			.map(|start| U256::from_be_slice(&tx.data[start..]))
			.unwrap_or_default();

		let scale = U256::from(10u64).pow(U256::from(TOKEN_DECIMALS));
		let Some(total_supply) = initial_supply.checked_mul(scale) else {
			return Execution::revert(None);
		};

		let address = tx.from.create(tx.nonce);
		let mut ledger = TokenLedger {
			total_supply,
			..Default::default()
		};
		ledger.balances.insert(tx.from, total_supply);
		self.tokens.insert(address, ledger);

		Execution {
			contract_address: Some(address),
			..Execution::ok()
		}
	}
}

fn word_address(data: &[u8], offset: usize) -> Option<Address> {
	data.get(offset + 12..offset + 32).map(Address::from_slice)
}

fn word_u256(data: &[u8], offset: usize) -> Option<U256> {
	data.get(offset..offset + 32).map(U256::from_be_slice)
}

fn execute_token_call(ledger: &mut TokenLedger, from: Address, data: &[u8]) -> Execution {
	if data.get(..4) != Some(TRANSFER.as_slice()) {
		return Execution::revert(None);
	}
	let (Some(to), Some(value)) = (word_address(data, 4), word_u256(data, 36)) else {
		return Execution::revert(None);
	};

	let sender_balance = ledger.balances.get(&from).copied().unwrap_or_default();
	if sender_balance < value {
		return Execution::revert(Some("Not enough balance"));
	}
	ledger.balances.insert(from, sender_balance - value);
	*ledger.balances.entry(to).or_default() += value;
	Execution::ok()
}

/// Simulated JSON-RPC node.
#[derive(Clone)]
pub struct MockGateway {
	node: Arc<Mutex<MockNode>>,
}

impl Default for MockGateway {
	fn default() -> Self {
		Self::new(DEFAULT_CHAIN_ID)
	}
}

impl MockGateway {
	pub fn new(chain_id: u64) -> Self {
		Self {
			node: Arc::new(Mutex::new(MockNode::new(chain_id))),
		}
	}

	fn node(&self) -> MutexGuard<'_, MockNode> {
		self.node.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Makes every request fail with a connectivity error while set.
	pub fn set_unreachable(&self, unreachable: bool) {
		self.node().unreachable = unreachable;
	}

	/// Fails the next broadcast with `error` without executing it.
	pub fn push_broadcast_error(&self, error: GatewayError) {
		self.node().broadcast_errors.push_back(error);
	}

	/// Fails the next receipt query with `error`.
	pub fn push_receipt_error(&self, error: GatewayError) {
		self.node().receipt_errors.push_back(error);
	}

	/// Answers the next nonce query with `nonce` instead of the real count,
	/// as a lagging load-balanced node would.
	pub fn push_nonce_reading(&self, nonce: u64) {
		self.node().nonce_readings.push_back(nonce);
	}

	/// Sets the transaction count of `address`.
	pub fn set_nonce(&self, address: Address, nonce: u64) {
		self.node().nonces.insert(address, nonce);
	}

	pub fn set_gas_price(&self, gas_price: u128) {
		self.node().gas_price = gas_price;
	}

	/// Number of polls answered with `None` before each new receipt appears.
	pub fn set_receipt_delay(&self, polls: u32) {
		self.node().receipt_delay = polls;
	}

	/// Hides all receipts until `release_receipts` is called.
	pub fn withhold_receipts(&self) {
		self.node().withhold_receipts = true;
	}

	pub fn release_receipts(&self) {
		let mut node = self.node();
		node.withhold_receipts = false;
		for mined in node.transactions.values_mut() {
			mined.hidden_polls = 0;
		}
	}

	/// Every transaction accepted so far, in broadcast order.
	pub fn broadcasts(&self) -> Vec<SignedTransaction> {
		self.node().broadcasts.clone()
	}

	/// Number of receipt queries served.
	pub fn receipt_polls(&self) -> u32 {
		self.node().receipt_polls
	}

	/// Current transaction count of `address`.
	pub fn nonce_of(&self, address: Address) -> u64 {
		self.node().nonces.get(&address).copied().unwrap_or_default()
	}

	/// Token balance of `holder` in a contract deployed on this node.
	pub fn token_balance(&self, token: Address, holder: Address) -> U256 {
		self.node()
			.tokens
			.get(&token)
			.and_then(|ledger| ledger.balances.get(&holder).copied())
			.unwrap_or_default()
	}
}

/// Configuration schema for the simulated node.
pub struct MockGatewaySchema;

impl MockGatewaySchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for MockGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new(
					"gas_price_gwei",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl GatewayInterface for MockGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockGatewaySchema)
	}

	async fn get_chain_id(&self) -> Result<u64, GatewayError> {
		let node = self.node();
		node.ensure_reachable()?;
		Ok(node.chain_id)
	}

	async fn get_nonce(&self, address: Address) -> Result<u64, GatewayError> {
		let mut node = self.node();
		node.ensure_reachable()?;
		if let Some(reading) = node.nonce_readings.pop_front() {
			return Ok(reading);
		}
		Ok(node.nonces.get(&address).copied().unwrap_or_default())
	}

	async fn get_gas_price(&self) -> Result<u128, GatewayError> {
		let node = self.node();
		node.ensure_reachable()?;
		Ok(node.gas_price)
	}

	async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionHash, GatewayError> {
		let mut node = self.node();
		node.ensure_reachable()?;
		if let Some(error) = node.broadcast_errors.pop_front() {
			return Err(error);
		}

		let unsigned = &tx.transaction;
		if node.transactions.contains_key(&tx.hash.0) {
			return Err(GatewayError::NodeRejected("already known".to_string()));
		}
		if unsigned.chain_id != node.chain_id {
			return Err(GatewayError::NodeRejected(format!(
				"invalid chain id: expected {}, got {}",
				node.chain_id, unsigned.chain_id
			)));
		}

		let expected = node.nonces.get(&unsigned.from).copied().unwrap_or_default();
		if unsigned.nonce < expected {
			return Err(GatewayError::NodeRejected(format!(
				"nonce too low: next nonce {}, tx nonce {}",
				expected, unsigned.nonce
			)));
		}
		if unsigned.nonce > expected {
			return Err(GatewayError::NodeRejected(format!(
				"nonce too high: next nonce {}, tx nonce {}",
				expected, unsigned.nonce
			)));
		}

		node.nonces.insert(unsigned.from, expected + 1);
		node.block_number += 1;
		let execution = node.execute(unsigned);
		if let Some(reason) = execution.revert_reason {
			node.revert_reasons
				.insert((unsigned.from, unsigned.nonce), reason);
		}

		let receipt = TransactionReceipt {
			transaction_hash: tx.hash,
			success: execution.success,
			contract_address: execution.contract_address,
			block_number: node.block_number,
			gas_used: unsigned
				.gas_limit
				.min(21_000 + 16 * unsigned.data.len() as u64),
		};
		let hidden_polls = node.receipt_delay;
		node.transactions.insert(
			tx.hash.0,
			MinedTransaction {
				receipt,
				hidden_polls,
			},
		);
		node.broadcasts.push(tx.clone());

		Ok(tx.hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, GatewayError> {
		let mut node = self.node();
		node.ensure_reachable()?;
		node.receipt_polls += 1;
		if let Some(error) = node.receipt_errors.pop_front() {
			return Err(error);
		}
		if node.withhold_receipts {
			return Ok(None);
		}

		match node.transactions.get_mut(&hash.0) {
			Some(mined) if mined.hidden_polls > 0 => {
				mined.hidden_polls -= 1;
				Ok(None)
			}
			Some(mined) => Ok(Some(mined.receipt.clone())),
			None => Ok(None),
		}
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
		let node = self.node();
		node.ensure_reachable()?;
		let Some(ledger) = node.tokens.get(&to) else {
			return Ok(Bytes::new());
		};

		let output = match data.get(..4) {
			Some(selector) if selector == BALANCE_OF => {
				let holder = word_address(&data, 4).ok_or_else(|| {
					GatewayError::NodeRejected("execution reverted".to_string())
				})?;
				ledger
					.balances
					.get(&holder)
					.copied()
					.unwrap_or_default()
					.abi_encode()
			}
			Some(selector) if selector == TOTAL_SUPPLY => ledger.total_supply.abi_encode(),
			Some(selector) if selector == DECIMALS => U256::from(TOKEN_DECIMALS).abi_encode(),
			Some(selector) if selector == NAME => TOKEN_NAME.to_string().abi_encode(),
			Some(selector) if selector == SYMBOL => TOKEN_SYMBOL.to_string().abi_encode(),
			_ => return Err(GatewayError::NodeRejected("execution reverted".to_string())),
		};
		Ok(Bytes::from(output))
	}

	async fn revert_reason(
		&self,
		tx: &UnsignedTransaction,
		_block_number: u64,
	) -> Result<Option<String>, GatewayError> {
		let node = self.node();
		node.ensure_reachable()?;
		Ok(node.revert_reasons.get(&(tx.from, tx.nonce)).cloned())
	}
}

/// Factory function to create a simulated node from configuration.
///
/// Configuration parameters:
/// - `chain_id` (optional): chain id reported by the node, default 31337
/// - `gas_price_gwei` (optional): gas price quote, default 10
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	MockGatewaySchema::validate_config(config)
		.map_err(|e| GatewayError::Implementation(format!("Invalid configuration: {}", e)))?;

	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_CHAIN_ID);

	let gateway = MockGateway::new(chain_id);
	if let Some(gwei) = config.get("gas_price_gwei").and_then(|v| v.as_integer()) {
		gateway.set_gas_price(gwei as u128 * WEI_PER_GWEI);
	}

	tracing::warn!(chain_id, "Using simulated node; nothing reaches a real chain");
	Ok(Box::new(gateway))
}

/// Registry for the simulated node.
pub struct Registry;

impl issuer_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = crate::GatewayFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl crate::GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use issuer_types::SignatureParts;

	fn signed(from: Address, to: Option<Address>, nonce: u64, data: Vec<u8>) -> SignedTransaction {
		let mut hash = [0u8; 32];
		hash[..20].copy_from_slice(from.as_slice());
		hash[24..].copy_from_slice(&nonce.to_be_bytes());
		SignedTransaction {
			transaction: UnsignedTransaction {
				from,
				to,
				nonce,
				gas_limit: 3_000_000,
				gas_price: 10 * WEI_PER_GWEI,
				chain_id: DEFAULT_CHAIN_ID,
				data: Bytes::from(data),
			},
			signature: SignatureParts {
				r: U256::from(1u64),
				s: U256::from(1u64),
				v: DEFAULT_CHAIN_ID * 2 + 35,
			},
			hash: TransactionHash(B256::from(hash)),
			raw: Bytes::new(),
		}
	}

	fn deploy_data(supply: u64) -> Vec<u8> {
		let mut data = vec![0x60, 0x80, 0x60, 0x40];
		data.extend_from_slice(&U256::from(supply).to_be_bytes::<32>());
		data
	}

	fn transfer_data(to: Address, value: U256) -> Vec<u8> {
		let mut data = TRANSFER.to_vec();
		data.extend_from_slice(&[0u8; 12]);
		data.extend_from_slice(to.as_slice());
		data.extend_from_slice(&value.to_be_bytes::<32>());
		data
	}

	fn call_data(selector: [u8; 4], holder: Option<Address>) -> Bytes {
		let mut data = selector.to_vec();
		if let Some(holder) = holder {
			data.extend_from_slice(&[0u8; 12]);
			data.extend_from_slice(holder.as_slice());
		}
		Bytes::from(data)
	}

	#[tokio::test]
	async fn test_deploy_and_transfer() {
		let node = MockGateway::default();
		let owner = Address::repeat_byte(0x11);
		let recipient = Address::repeat_byte(0x22);

		node.broadcast(&signed(owner, None, 0, deploy_data(1_000)))
			.await
			.unwrap();
		let token = owner.create(0);
		let scale = U256::from(10u64).pow(U256::from(18u64));
		assert_eq!(node.token_balance(token, owner), U256::from(1_000u64) * scale);

		let tx = signed(owner, Some(token), 1, transfer_data(recipient, U256::from(100u64)));
		let hash = node.broadcast(&tx).await.unwrap();
		let receipt = node.get_receipt(&hash).await.unwrap().unwrap();
		assert!(receipt.success);
		assert_eq!(receipt.block_number, 2);
		assert_eq!(node.token_balance(token, recipient), U256::from(100u64));
		assert_eq!(node.nonce_of(owner), 2);

		let output = node
			.call(token, call_data(BALANCE_OF, Some(recipient)))
			.await
			.unwrap();
		assert_eq!(U256::from_be_slice(&output), U256::from(100u64));

		let output = node.call(token, call_data(SYMBOL, None)).await.unwrap();
		assert_eq!(String::abi_decode(&output).unwrap(), "MEME");
	}

	#[tokio::test]
	async fn test_insufficient_balance_reverts() {
		let node = MockGateway::default();
		let owner = Address::repeat_byte(0x11);
		let stranger = Address::repeat_byte(0x33);
		node.broadcast(&signed(owner, None, 0, deploy_data(1)))
			.await
			.unwrap();
		let token = owner.create(0);

		let tx = signed(stranger, Some(token), 0, transfer_data(owner, U256::from(5u64)));
		let hash = node.broadcast(&tx).await.unwrap();
		let receipt = node.get_receipt(&hash).await.unwrap().unwrap();

		assert!(!receipt.success);
		assert_eq!(node.token_balance(token, stranger), U256::ZERO);
		assert_eq!(
			node.revert_reason(&tx.transaction, receipt.block_number)
				.await
				.unwrap(),
			Some("Not enough balance".to_string())
		);
	}

	#[tokio::test]
	async fn test_nonce_enforcement() {
		let node = MockGateway::default();
		let owner = Address::repeat_byte(0x11);
		node.set_nonce(owner, 5);

		let err = node
			.broadcast(&signed(owner, Some(owner), 4, vec![]))
			.await
			.unwrap_err();
		assert!(err.is_nonce_conflict());

		let err = node
			.broadcast(&signed(owner, Some(owner), 7, vec![]))
			.await
			.unwrap_err();
		assert!(!err.is_nonce_conflict());

		let tx = signed(owner, Some(owner), 5, vec![]);
		node.broadcast(&tx).await.unwrap();
		let err = node.broadcast(&tx).await.unwrap_err();
		assert!(err.is_already_known());
		assert_eq!(node.broadcasts().len(), 1);
	}

	#[tokio::test]
	async fn test_scripting_hooks() {
		let node = MockGateway::default();
		let owner = Address::repeat_byte(0x11);

		node.push_nonce_reading(3);
		assert_eq!(node.get_nonce(owner).await.unwrap(), 3);
		assert_eq!(node.get_nonce(owner).await.unwrap(), 0);

		node.set_receipt_delay(1);
		let hash = node
			.broadcast(&signed(owner, Some(owner), 0, vec![]))
			.await
			.unwrap();
		assert!(node.get_receipt(&hash).await.unwrap().is_none());
		assert!(node.get_receipt(&hash).await.unwrap().is_some());
		assert_eq!(node.receipt_polls(), 2);

		node.withhold_receipts();
		assert!(node.get_receipt(&hash).await.unwrap().is_none());
		node.release_receipts();
		assert!(node.get_receipt(&hash).await.unwrap().is_some());

		node.set_unreachable(true);
		assert!(node.get_chain_id().await.unwrap_err().is_connectivity());
		node.set_unreachable(false);

		node.push_receipt_error(GatewayError::Implementation("bad receipt".into()));
		assert!(matches!(
			node.get_receipt(&hash).await,
			Err(GatewayError::Implementation(_))
		));
		assert!(node.get_receipt(&hash).await.unwrap().is_some());

		node.push_broadcast_error(GatewayError::NodeRejected("insufficient funds".into()));
		let err = node
			.broadcast(&signed(owner, Some(owner), 1, vec![]))
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "Node rejected request: insufficient funds");
		assert_eq!(node.nonce_of(owner), 1);
	}

	#[test]
	fn test_factory_reads_chain_id() {
		let config: toml::Value = toml::from_str("chain_id = 11155111").unwrap();
		assert!(create_gateway(&config).is_ok());

		let config: toml::Value = toml::from_str("chain_id = 0").unwrap();
		assert!(create_gateway(&config).is_err());
	}
}
