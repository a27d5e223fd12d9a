//! Operation state machine.
//!
//! Tracks one operation through BUILT -> SIGNED -> BROADCAST -> PENDING and a
//! terminal state, validating every transition against a static table and
//! publishing each accepted transition on the event bus.

use crate::engine::event_bus::EventBus;
use crate::IssuerError;
use issuer_types::{LifecycleEvent, TransactionHash, TransactionKind, TransactionState};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Static transition table - each state maps to allowed next states.
static TRANSITIONS: Lazy<HashMap<TransactionState, HashSet<TransactionState>>> =
	Lazy::new(|| {
		use TransactionState::*;
		let mut m = HashMap::new();
		m.insert(Built, HashSet::from([Signed]));
		m.insert(Signed, HashSet::from([Broadcast]));
		// Back to Built when the node reports a nonce conflict
		m.insert(Broadcast, HashSet::from([Pending, Built]));
		m.insert(Pending, HashSet::from([Confirmed, Reverted, Stuck]));
		m.insert(Confirmed, HashSet::new()); // terminal
		m.insert(Reverted, HashSet::new()); // terminal
		m.insert(Stuck, HashSet::new()); // terminal
		m
	});

/// Checks if a state transition is valid.
pub fn is_valid_transition(from: TransactionState, to: TransactionState) -> bool {
	TRANSITIONS
		.get(&from)
		.is_some_and(|set| set.contains(&to))
}

/// State of one in-flight operation.
#[derive(Debug)]
pub struct OperationTracker {
	operation_id: String,
	kind: TransactionKind,
	state: Option<TransactionState>,
	nonce: Option<u64>,
	tx_hash: Option<TransactionHash>,
	attempt: u32,
	event_bus: EventBus,
}

impl OperationTracker {
	pub fn new(kind: TransactionKind, event_bus: EventBus) -> Self {
		Self {
			operation_id: uuid::Uuid::new_v4().to_string(),
			kind,
			state: None,
			nonce: None,
			tx_hash: None,
			attempt: 0,
			event_bus,
		}
	}

	pub fn operation_id(&self) -> &str {
		&self.operation_id
	}

	pub fn kind(&self) -> TransactionKind {
		self.kind
	}

	pub fn state(&self) -> Option<TransactionState> {
		self.state
	}

	pub fn attempt(&self) -> u32 {
		self.attempt
	}

	/// Enters BUILT for a new attempt with the given nonce.
	pub fn built(&mut self, nonce: u64) -> Result<(), IssuerError> {
		self.check(TransactionState::Built)?;
		self.nonce = Some(nonce);
		self.tx_hash = None;
		self.attempt += 1;
		self.transition(TransactionState::Built)
	}

	/// Enters SIGNED once the hash is known.
	pub fn signed(&mut self, tx_hash: TransactionHash) -> Result<(), IssuerError> {
		self.check(TransactionState::Signed)?;
		self.tx_hash = Some(tx_hash);
		self.transition(TransactionState::Signed)
	}

	fn check(&self, to: TransactionState) -> Result<(), IssuerError> {
		match self.state {
			// Every operation starts in BUILT
			None if to != TransactionState::Built => Err(IssuerError::InvalidTransition {
				from: TransactionState::Built,
				to,
			}),
			Some(from) if !is_valid_transition(from, to) => {
				Err(IssuerError::InvalidTransition { from, to })
			}
			_ => Ok(()),
		}
	}

	/// Moves to `to`, publishing the transition.
	pub fn transition(&mut self, to: TransactionState) -> Result<(), IssuerError> {
		self.check(to)?;
		self.state = Some(to);
		tracing::debug!(
			operation_id = %self.operation_id,
			state = %to,
			attempt = self.attempt,
			"Operation state changed"
		);
		self.event_bus
			.publish(LifecycleEvent {
				operation_id: self.operation_id.clone(),
				kind: self.kind,
				state: to,
				nonce: self.nonce,
				tx_hash: self.tx_hash,
				attempt: self.attempt,
			})
			.ok();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use issuer_types::B256;
	use TransactionState::*;

	#[test]
	fn test_transition_table() {
		assert!(is_valid_transition(Built, Signed));
		assert!(is_valid_transition(Broadcast, Built));
		assert!(is_valid_transition(Pending, Stuck));
		assert!(!is_valid_transition(Built, Pending));
		assert!(!is_valid_transition(Pending, Built));
		for terminal in [Confirmed, Reverted, Stuck] {
			for next in [Built, Signed, Broadcast, Pending, Confirmed, Reverted, Stuck] {
				assert!(!is_valid_transition(terminal, next));
			}
		}
	}

	#[tokio::test]
	async fn test_tracker_publishes_transitions() {
		let bus = EventBus::default();
		let mut events = bus.subscribe();
		let mut tracker = OperationTracker::new(TransactionKind::Call, bus);
		let hash = TransactionHash(B256::repeat_byte(0xab));

		tracker.built(5).unwrap();
		tracker.signed(hash).unwrap();
		tracker.transition(Broadcast).unwrap();
		tracker.transition(Pending).unwrap();
		tracker.transition(Confirmed).unwrap();

		let mut states = Vec::new();
		while let Ok(event) = events.try_recv() {
			assert_eq!(event.operation_id, tracker.operation_id());
			assert_eq!(event.nonce, Some(5));
			assert_eq!(event.attempt, 1);
			states.push(event.state);
		}
		assert_eq!(states, vec![Built, Signed, Broadcast, Pending, Confirmed]);
	}

	#[test]
	fn test_invalid_transitions_are_rejected() {
		let mut tracker = OperationTracker::new(TransactionKind::Deploy, EventBus::default());
		assert!(matches!(
			tracker.transition(Signed),
			Err(IssuerError::InvalidTransition { to: Signed, .. })
		));

		tracker.built(0).unwrap();
		assert!(matches!(
			tracker.transition(Confirmed),
			Err(IssuerError::InvalidTransition {
				from: Built,
				to: Confirmed
			})
		));
		assert_eq!(tracker.state(), Some(Built));
	}

	#[test]
	fn test_retry_resets_hash_and_counts_attempts() {
		let mut tracker = OperationTracker::new(TransactionKind::Call, EventBus::default());
		tracker.built(5).unwrap();
		tracker
			.signed(TransactionHash(B256::repeat_byte(1)))
			.unwrap();
		tracker.transition(Broadcast).unwrap();
		tracker.built(6).unwrap();
		assert_eq!(tracker.attempt(), 2);
		assert_eq!(tracker.state(), Some(Built));
	}
}
