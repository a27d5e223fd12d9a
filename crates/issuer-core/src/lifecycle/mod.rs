//! Transaction lifecycle management.
//!
//! Drives an intent through build, sign, broadcast and confirmation. The
//! per-account nonce lock is held from the nonce fetch until the node has
//! answered the broadcast, then released, so the next operation can be built
//! while this one is still pending. Nonce conflicts reported by the node are
//! retried here and nowhere else.

pub mod monitor;
pub mod state;

use alloy::dyn_abi::DynSolValue;
use crate::engine::event_bus::EventBus;
use crate::nonce::NonceManager;
use crate::transaction::{TransactionBuilder, TransactionIntent};
use crate::IssuerError;
use issuer_account::AccountService;
use issuer_config::LifecycleConfig;
use issuer_contract::{ContractArtifact, DeployedContract};
use issuer_gateway::GatewayService;
use issuer_types::{
	truncate_id, ChainContext, SignedTransaction, TransactionHash, TransactionKind,
	TransactionReceipt, TransactionState, UnsignedTransaction,
};
use monitor::{MonitorResult, ReceiptMonitor};
use state::OperationTracker;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Retry and polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
	/// Broadcast attempts allowed when the node reports a nonce conflict.
	pub max_nonce_attempts: u32,
	pub poll_interval: Duration,
	pub receipt_timeout: Duration,
}

impl Default for LifecycleSettings {
	fn default() -> Self {
		Self::from(&LifecycleConfig::default())
	}
}

impl From<&LifecycleConfig> for LifecycleSettings {
	fn from(config: &LifecycleConfig) -> Self {
		Self {
			max_nonce_attempts: config.max_nonce_attempts.max(1),
			poll_interval: config.poll_interval(),
			receipt_timeout: config.receipt_timeout(),
		}
	}
}

/// A transaction the node has accepted, not yet mined.
///
/// Dropping it abandons the wait; the transaction stays in the node's pool.
#[derive(Debug)]
pub struct PendingTransaction {
	tracker: OperationTracker,
	transaction: SignedTransaction,
	tx_hash: TransactionHash,
}

impl PendingTransaction {
	pub fn tx_hash(&self) -> TransactionHash {
		self.tx_hash
	}

	pub fn nonce(&self) -> u64 {
		self.transaction.transaction.nonce
	}

	pub fn operation_id(&self) -> &str {
		self.tracker.operation_id()
	}

	pub fn kind(&self) -> TransactionKind {
		self.tracker.kind()
	}

	/// The signed transaction as broadcast.
	pub fn transaction(&self) -> &SignedTransaction {
		&self.transaction
	}
}

/// Terminal result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
	Confirmed {
		receipt: TransactionReceipt,
	},
	/// Mined with a failure status. `reason` is the decoded revert string,
	/// when the node could reproduce it.
	Reverted {
		receipt: TransactionReceipt,
		reason: Option<String>,
	},
	/// No receipt within the receipt timeout. The transaction may still be
	/// mined later; the outcome does not change if it is.
	Stuck {
		tx_hash: TransactionHash,
		nonce: u64,
		elapsed: Duration,
	},
}

impl TransactionOutcome {
	pub fn state(&self) -> TransactionState {
		match self {
			TransactionOutcome::Confirmed { .. } => TransactionState::Confirmed,
			TransactionOutcome::Reverted { .. } => TransactionState::Reverted,
			TransactionOutcome::Stuck { .. } => TransactionState::Stuck,
		}
	}

	pub fn tx_hash(&self) -> TransactionHash {
		match self {
			TransactionOutcome::Confirmed { receipt } | TransactionOutcome::Reverted { receipt, .. } => {
				receipt.transaction_hash
			}
			TransactionOutcome::Stuck { tx_hash, .. } => *tx_hash,
		}
	}

	pub fn receipt(&self) -> Option<&TransactionReceipt> {
		match self {
			TransactionOutcome::Confirmed { receipt } | TransactionOutcome::Reverted { receipt, .. } => {
				Some(receipt)
			}
			TransactionOutcome::Stuck { .. } => None,
		}
	}
}

/// Terminal result of a contract deployment.
#[derive(Debug, Clone)]
pub enum DeploymentOutcome {
	Deployed {
		contract: DeployedContract,
		receipt: TransactionReceipt,
	},
	Reverted {
		receipt: TransactionReceipt,
		reason: Option<String>,
	},
	Stuck {
		tx_hash: TransactionHash,
		nonce: u64,
		elapsed: Duration,
	},
}

impl DeploymentOutcome {
	fn from_outcome(
		outcome: TransactionOutcome,
		artifact: Arc<ContractArtifact>,
	) -> Result<Self, IssuerError> {
		Ok(match outcome {
			TransactionOutcome::Confirmed { receipt } => {
				let address = receipt
					.contract_address
					.ok_or(IssuerError::MissingContractAddress(receipt.transaction_hash))?;
				DeploymentOutcome::Deployed {
					contract: DeployedContract::new(address, artifact),
					receipt,
				}
			}
			TransactionOutcome::Reverted { receipt, reason } => {
				DeploymentOutcome::Reverted { receipt, reason }
			}
			TransactionOutcome::Stuck {
				tx_hash,
				nonce,
				elapsed,
			} => DeploymentOutcome::Stuck {
				tx_hash,
				nonce,
				elapsed,
			},
		})
	}

	pub fn state(&self) -> TransactionState {
		match self {
			DeploymentOutcome::Deployed { .. } => TransactionState::Confirmed,
			DeploymentOutcome::Reverted { .. } => TransactionState::Reverted,
			DeploymentOutcome::Stuck { .. } => TransactionState::Stuck,
		}
	}

	/// The deployed contract, when the deployment was confirmed.
	pub fn contract(&self) -> Option<&DeployedContract> {
		match self {
			DeploymentOutcome::Deployed { contract, .. } => Some(contract),
			_ => None,
		}
	}
}

/// Runs transactions from intent to terminal outcome.
pub struct LifecycleManager {
	account: Arc<AccountService>,
	gateway: GatewayService,
	builder: TransactionBuilder,
	monitor: ReceiptMonitor,
	nonces: NonceManager,
	event_bus: EventBus,
	settings: LifecycleSettings,
}

impl LifecycleManager {
	pub fn new(
		account: Arc<AccountService>,
		gateway: GatewayService,
		context: ChainContext,
		event_bus: EventBus,
		settings: LifecycleSettings,
	) -> Self {
		Self {
			builder: TransactionBuilder::new(gateway.clone(), context),
			monitor: ReceiptMonitor::new(
				gateway.clone(),
				settings.poll_interval,
				settings.receipt_timeout,
			),
			account,
			gateway,
			nonces: NonceManager::new(),
			event_bus,
			settings,
		}
	}

	pub fn settings(&self) -> &LifecycleSettings {
		&self.settings
	}

	/// Builds, signs and broadcasts an intent.
	///
	/// Returns once the node has accepted the transaction. Arguments are
	/// encoded before any nonce is reserved, so an encoding error never
	/// reaches the signer or the node.
	#[instrument(skip_all, fields(kind = ?intent.kind()))]
	pub async fn broadcast(
		&self,
		intent: TransactionIntent,
	) -> Result<PendingTransaction, IssuerError> {
		let encoded = self.builder.encode(&intent)?;
		let from = self.account.get_address().await?;
		let mut tracker = OperationTracker::new(intent.kind(), self.event_bus.clone());
		tracing::info!(
			operation_id = %truncate_id(tracker.operation_id()),
			intent = %intent.describe(),
			"Submitting transaction"
		);

		let mut slot = self.nonces.lock(from).await;
		loop {
			let unsigned = self.builder.build(&encoded, from, &slot).await?;
			let nonce = unsigned.nonce;
			tracker.built(nonce)?;

			let signed = self.account.sign(&unsigned).await?;
			tracker.signed(signed.hash)?;

			tracker.transition(TransactionState::Broadcast)?;
			let tx_hash = match self.gateway.broadcast(&signed).await {
				Ok(hash) => {
					if hash != signed.hash {
						tracing::warn!(
							local = %truncate_id(&signed.hash.to_hex()),
							node = %truncate_id(&hash.to_hex()),
							"Node reported a different transaction hash"
						);
					}
					hash
				}
				Err(e) if e.is_already_known() => {
					tracing::info!(
						nonce,
						tx_hash = %truncate_id(&signed.hash.to_hex()),
						"Transaction already in the node's pool"
					);
					signed.hash
				}
				Err(e) if e.is_nonce_conflict() => {
					// The node has seen this nonce; never hand it out again.
					slot.commit(nonce);
					if tracker.attempt() >= self.settings.max_nonce_attempts {
						tracing::error!(
							nonce,
							attempt = tracker.attempt(),
							error = %e,
							"Nonce conflict retries exhausted"
						);
						return Err(e.into());
					}
					tracing::warn!(
						nonce,
						attempt = tracker.attempt(),
						error = %e,
						"Nonce conflict, rebuilding with a fresh nonce"
					);
					continue;
				}
				// Dropping the slot without a commit releases the nonce.
				Err(e) => return Err(e.into()),
			};

			slot.commit(nonce);
			tracker.transition(TransactionState::Pending)?;
			return Ok(PendingTransaction {
				tracker,
				transaction: signed,
				tx_hash,
			});
		}
	}

	/// Waits for a broadcast transaction to reach a terminal state.
	///
	/// A receipt query the node refuses outright ends the wait as stuck; the
	/// transaction may still be mined, so its nonce stays consumed.
	#[instrument(skip_all, fields(
		operation_id = %truncate_id(pending.operation_id()),
		tx_hash = %truncate_id(&pending.tx_hash.to_hex()),
	))]
	pub async fn wait(&self, pending: PendingTransaction) -> Result<TransactionOutcome, IssuerError> {
		let PendingTransaction {
			mut tracker,
			transaction,
			tx_hash,
		} = pending;

		let start_time = tokio::time::Instant::now();
		let result = match self.monitor.wait(&tx_hash).await {
			Ok(result) => result,
			Err(e) => {
				tracing::error!(error = %e, "Receipt monitoring failed");
				MonitorResult::TimedOut(start_time.elapsed())
			}
		};

		match result {
			MonitorResult::Mined(receipt) if receipt.success => {
				tracker.transition(TransactionState::Confirmed)?;
				tracing::info!(
					block_number = receipt.block_number,
					gas_used = receipt.gas_used,
					"Confirmed"
				);
				Ok(TransactionOutcome::Confirmed { receipt })
			}
			MonitorResult::Mined(receipt) => {
				let reason = self
					.revert_reason(&transaction.transaction, receipt.block_number)
					.await;
				tracker.transition(TransactionState::Reverted)?;
				tracing::warn!(
					block_number = receipt.block_number,
					reason = reason.as_deref().unwrap_or("unknown"),
					"Transaction reverted"
				);
				Ok(TransactionOutcome::Reverted { receipt, reason })
			}
			MonitorResult::TimedOut(elapsed) => {
				tracker.transition(TransactionState::Stuck)?;
				Ok(TransactionOutcome::Stuck {
					tx_hash,
					nonce: transaction.transaction.nonce,
					elapsed,
				})
			}
		}
	}

	/// Broadcasts an intent and waits for its outcome.
	pub async fn submit(
		&self,
		intent: TransactionIntent,
	) -> Result<TransactionOutcome, IssuerError> {
		let pending = self.broadcast(intent).await?;
		self.wait(pending).await
	}

	/// Deploys a contract and waits for its outcome.
	pub async fn deploy(
		&self,
		artifact: Arc<ContractArtifact>,
		constructor_args: Vec<DynSolValue>,
	) -> Result<DeploymentOutcome, IssuerError> {
		let outcome = self
			.submit(TransactionIntent::deploy(artifact.clone(), constructor_args))
			.await?;
		let deployment = DeploymentOutcome::from_outcome(outcome, artifact)?;
		if let Some(contract) = deployment.contract() {
			tracing::info!(
				contract = contract.name(),
				address = %contract.address,
				"Contract deployed"
			);
		}
		Ok(deployment)
	}

	async fn revert_reason(&self, tx: &UnsignedTransaction, block_number: u64) -> Option<String> {
		match self.gateway.revert_reason(tx, block_number).await {
			Ok(reason) => reason,
			Err(e) => {
				tracing::debug!(error = %e, "Could not recover revert reason");
				None
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{
		chain_context, deploy_token, lifecycle, memecoin_artifact, transfer_intent, CountingAccount,
		OWNER,
	};
	use issuer_gateway::implementations::mock::MockGateway;
	use issuer_gateway::GatewayError;
	use issuer_types::{Address, U256};

	const SUPPLY: u64 = 1_000_000;

	fn whole_tokens(amount: u64) -> U256 {
		U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
	}

	fn drain_states(
		events: &mut tokio::sync::broadcast::Receiver<issuer_types::LifecycleEvent>,
	) -> Vec<(TransactionState, u32)> {
		let mut states = Vec::new();
		while let Ok(event) = events.try_recv() {
			states.push((event.state, event.attempt));
		}
		states
	}

	#[tokio::test(start_paused = true)]
	async fn test_deployment_address_comes_from_receipt() {
		let node = MockGateway::default();
		let (manager, _) = lifecycle(&node);

		let outcome = manager
			.deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(SUPPLY), 256)],
			)
			.await
			.unwrap();

		match outcome {
			DeploymentOutcome::Deployed { contract, receipt } => {
				assert_eq!(Some(contract.address), receipt.contract_address);
				assert_eq!(contract.address, OWNER.create(0));
				assert_eq!(contract.name(), "MemeCoin");
				assert_eq!(
					node.token_balance(contract.address, OWNER),
					whole_tokens(SUPPLY)
				);
			}
			other => panic!("expected deployment, got {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_sequential_operations_use_consecutive_nonces() {
		let node = MockGateway::default();
		node.set_nonce(OWNER, 3);
		let (manager, _) = lifecycle(&node);
		let token = deploy_token(&manager, SUPPLY).await;

		for _ in 0..4 {
			let outcome = manager
				.submit(transfer_intent(&token, Address::repeat_byte(0x42), U256::from(1u64)))
				.await
				.unwrap();
			assert_eq!(outcome.state(), TransactionState::Confirmed);
		}

		let nonces: Vec<u64> = node
			.broadcasts()
			.iter()
			.map(|tx| tx.transaction.nonce)
			.collect();
		assert_eq!(nonces, vec![3, 4, 5, 6, 7]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_transfer_scenario_confirms_on_second_poll() {
		let node = MockGateway::default();
		let (manager, bus) = lifecycle(&node);
		let token = deploy_token(&manager, SUPPLY).await;
		assert_eq!(node.nonce_of(OWNER), 1);
		node.set_nonce(OWNER, 5);
		node.set_receipt_delay(1);

		let recipient = Address::repeat_byte(0x42);
		let mut events = bus.subscribe();
		let polls_before = node.receipt_polls();

		let pending = manager
			.broadcast(transfer_intent(&token, recipient, U256::from(100u64)))
			.await
			.unwrap();
		assert_eq!(pending.nonce(), 5);
		assert_eq!(pending.tx_hash(), pending.transaction().hash);

		let outcome = manager.wait(pending).await.unwrap();
		assert_eq!(outcome.state(), TransactionState::Confirmed);
		assert_eq!(node.receipt_polls() - polls_before, 2);
		assert_eq!(node.token_balance(token.address, recipient), U256::from(100u64));

		let states: Vec<_> = drain_states(&mut events).into_iter().map(|(s, _)| s).collect();
		assert_eq!(
			states,
			vec![
				TransactionState::Built,
				TransactionState::Signed,
				TransactionState::Broadcast,
				TransactionState::Pending,
				TransactionState::Confirmed,
			]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_insufficient_balance_reverts_with_reason() {
		let node = MockGateway::default();
		let (manager, _) = lifecycle(&node);
		let token = deploy_token(&manager, SUPPLY).await;
		let recipient = Address::repeat_byte(0x42);

		let outcome = manager
			.submit(transfer_intent(&token, recipient, whole_tokens(SUPPLY + 1)))
			.await
			.unwrap();

		match outcome {
			TransactionOutcome::Reverted { receipt, reason } => {
				assert!(!receipt.success);
				assert_eq!(reason.as_deref(), Some("Not enough balance"));
			}
			other => panic!("expected revert, got {other:?}"),
		}
		assert_eq!(node.token_balance(token.address, recipient), U256::ZERO);
		assert_eq!(node.token_balance(token.address, OWNER), whole_tokens(SUPPLY));
	}

	#[tokio::test(start_paused = true)]
	async fn test_nonce_too_low_is_retried_once() {
		let node = MockGateway::default();
		node.set_nonce(OWNER, 6);
		// A lagging node reports 5 although 5 was already used
		node.push_nonce_reading(5);
		let (manager, bus) = lifecycle(&node);
		let mut events = bus.subscribe();

		let pending = manager
			.broadcast(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap();
		assert_eq!(pending.nonce(), 6);

		let states = drain_states(&mut events);
		assert_eq!(
			states,
			vec![
				(TransactionState::Built, 1),
				(TransactionState::Signed, 1),
				(TransactionState::Broadcast, 1),
				(TransactionState::Built, 2),
				(TransactionState::Signed, 2),
				(TransactionState::Broadcast, 2),
				(TransactionState::Pending, 2),
			]
		);
		assert_eq!(node.broadcasts().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_nonce_conflict_retries_are_bounded() {
		let node = MockGateway::default();
		for _ in 0..3 {
			node.push_broadcast_error(GatewayError::NodeRejected(
				"replacement transaction underpriced".to_string(),
			));
		}
		let (manager, bus) = lifecycle(&node);
		let mut events = bus.subscribe();

		let err = manager
			.submit(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap_err();
		assert!(matches!(err, IssuerError::NodeRejected(_)));
		assert_eq!(err.kind(), crate::ErrorKind::Rejected);

		let states = drain_states(&mut events);
		assert_eq!(states.last(), Some(&(TransactionState::Broadcast, 3)));
		assert!(node.broadcasts().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_already_known_resolves_to_pending_with_local_hash() {
		let node = MockGateway::default();
		node.push_broadcast_error(GatewayError::NodeRejected("already known".to_string()));
		let (manager, bus) = lifecycle(&node);
		let mut events = bus.subscribe();

		let pending = manager
			.broadcast(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap();
		assert_eq!(pending.tx_hash(), pending.transaction().hash);

		let states = drain_states(&mut events);
		assert_eq!(states.last(), Some(&(TransactionState::Pending, 1)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_already_imported_resolves_to_pending_at_original_nonce() {
		let node = MockGateway::default();
		node.push_broadcast_error(GatewayError::NodeRejected(
			"Transaction with the same hash was already imported.".to_string(),
		));
		let (manager, bus) = lifecycle(&node);
		let mut events = bus.subscribe();

		let pending = manager
			.broadcast(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap();
		assert_eq!(pending.nonce(), 0);
		assert_eq!(pending.tx_hash(), pending.transaction().hash);

		let states = drain_states(&mut events);
		assert_eq!(states.last(), Some(&(TransactionState::Pending, 1)));
		assert!(!states.contains(&(TransactionState::Built, 2)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_terminal_rejection_releases_nonce() {
		let node = MockGateway::default();
		node.push_broadcast_error(GatewayError::NodeRejected(
			"insufficient funds for gas * price + value".to_string(),
		));
		let (manager, _) = lifecycle(&node);
		let intent = TransactionIntent::deploy(
			memecoin_artifact(),
			vec![DynSolValue::Uint(U256::from(1u64), 256)],
		);

		let err = manager.broadcast(intent.clone()).await.unwrap_err();
		assert!(matches!(err, IssuerError::NodeRejected(_)));

		// The next operation reuses the nonce, leaving no gap
		let pending = manager.broadcast(intent).await.unwrap();
		assert_eq!(pending.nonce(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_encoding_errors_never_reach_the_signer() {
		let node = MockGateway::default();
		let account = CountingAccount::new();
		let manager = LifecycleManager::new(
			Arc::new(AccountService::new(Box::new(account.clone()))),
			GatewayService::new(Box::new(node.clone())),
			chain_context(),
			EventBus::default(),
			LifecycleSettings::default(),
		);
		let token = DeployedContract::new(Address::repeat_byte(0x99), memecoin_artifact());

		let err = manager
			.broadcast(TransactionIntent::call(
				token,
				"transfer",
				vec![DynSolValue::Bool(true)],
			))
			.await
			.unwrap_err();

		assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
		assert_eq!(account.signatures(), 0);
		assert!(node.broadcasts().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_stuck_outcome_is_final() {
		let node = MockGateway::default();
		node.withhold_receipts();
		let (manager, bus) = lifecycle(&node);
		let mut events = bus.subscribe();

		let outcome = manager
			.submit(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap();
		node.release_receipts();

		match &outcome {
			TransactionOutcome::Stuck { nonce, elapsed, .. } => {
				assert_eq!(*nonce, 0);
				assert!(*elapsed >= manager.settings().receipt_timeout);
			}
			other => panic!("expected stuck, got {other:?}"),
		}
		assert_eq!(outcome.state(), TransactionState::Stuck);
		assert!(outcome.receipt().is_none());
		let states = drain_states(&mut events);
		assert_eq!(states.last(), Some(&(TransactionState::Stuck, 1)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_refused_receipt_query_ends_stuck() {
		let node = MockGateway::default();
		node.push_receipt_error(GatewayError::Implementation(
			"malformed receipt".to_string(),
		));
		let (manager, bus) = lifecycle(&node);
		let mut events = bus.subscribe();

		let outcome = manager
			.submit(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap();

		match &outcome {
			TransactionOutcome::Stuck { tx_hash, nonce, .. } => {
				assert_eq!(*nonce, 0);
				assert_eq!(*tx_hash, node.broadcasts()[0].hash);
			}
			other => panic!("expected stuck, got {other:?}"),
		}
		let states = drain_states(&mut events);
		assert_eq!(states.last(), Some(&(TransactionState::Stuck, 1)));

		// The nonce stays consumed
		let pending = manager
			.broadcast(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap();
		assert_eq!(pending.nonce(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_broadcast_while_previous_is_pending() {
		let node = MockGateway::default();
		let (manager, _) = lifecycle(&node);
		let token = deploy_token(&manager, SUPPLY).await;
		node.withhold_receipts();

		let first = manager
			.broadcast(transfer_intent(&token, Address::repeat_byte(1), U256::from(1u64)))
			.await
			.unwrap();
		let second = manager
			.broadcast(transfer_intent(&token, Address::repeat_byte(2), U256::from(2u64)))
			.await
			.unwrap();
		assert_eq!((first.nonce(), second.nonce()), (1, 2));

		node.release_receipts();
		let (first, second) = tokio::join!(manager.wait(first), manager.wait(second));
		assert_eq!(first.unwrap().state(), TransactionState::Confirmed);
		assert_eq!(second.unwrap().state(), TransactionState::Confirmed);
	}

	#[tokio::test(start_paused = true)]
	async fn test_concurrent_broadcasts_get_distinct_nonces() {
		let node = MockGateway::default();
		let (manager, _) = lifecycle(&node);
		let manager = Arc::new(manager);

		let handles: Vec<_> = (0..5u64)
			.map(|i| {
				let manager = manager.clone();
				tokio::spawn(async move {
					manager
						.broadcast(TransactionIntent::deploy(
							memecoin_artifact(),
							vec![DynSolValue::Uint(U256::from(i + 1), 256)],
						))
						.await
						.map(|pending| pending.nonce())
				})
			})
			.collect();

		let mut nonces = Vec::new();
		for handle in handles {
			nonces.push(handle.await.unwrap().unwrap());
		}
		nonces.sort_unstable();
		assert_eq!(nonces, vec![0, 1, 2, 3, 4]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_connectivity_failure_before_broadcast_is_transient() {
		let node = MockGateway::default();
		let (manager, bus) = lifecycle(&node);
		let mut events = bus.subscribe();
		node.set_unreachable(true);

		let err = manager
			.broadcast(TransactionIntent::deploy(
				memecoin_artifact(),
				vec![DynSolValue::Uint(U256::from(1u64), 256)],
			))
			.await
			.unwrap_err();
		assert_eq!(err.kind(), crate::ErrorKind::Transient);
		assert!(drain_states(&mut events).is_empty());
	}
}
