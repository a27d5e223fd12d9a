//! Per-account nonce allocation.
//!
//! Each account has one slot guarded by an async mutex. The lifecycle manager
//! holds the slot from the nonce fetch until the broadcast has been answered,
//! so two operations on the same account never race for a nonce. The slot
//! remembers the highest nonce the node has consumed, which keeps allocation
//! strictly increasing even when the node reports a stale count.

use dashmap::DashMap;
use issuer_types::Address;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Allocation state of one account.
#[derive(Debug, Default)]
pub struct NonceSlot {
	last_issued: Option<u64>,
}

impl NonceSlot {
	/// Nonce to use next, given the count the node just reported.
	pub fn reserve(&self, chain_nonce: u64) -> u64 {
		match self.last_issued {
			Some(last) => chain_nonce.max(last + 1),
			None => chain_nonce,
		}
	}

	/// Marks `nonce` as consumed: the node accepted it, or reported it as
	/// already used.
	pub fn commit(&mut self, nonce: u64) {
		self.last_issued = Some(self.last_issued.map_or(nonce, |last| last.max(nonce)));
	}

	pub fn last_issued(&self) -> Option<u64> {
		self.last_issued
	}
}

/// Table of nonce slots keyed by account.
#[derive(Default)]
pub struct NonceManager {
	slots: DashMap<Address, Arc<Mutex<NonceSlot>>>,
}

impl NonceManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits for exclusive use of the account's slot.
	///
	/// A reserved nonce that is never committed is released when the guard
	/// drops, and the next operation reuses it.
	pub async fn lock(&self, account: Address) -> OwnedMutexGuard<NonceSlot> {
		let slot = self.slots.entry(account).or_default().clone();
		slot.lock_owned().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn test_reserve_never_goes_backwards() {
		let mut slot = NonceSlot::default();
		assert_eq!(slot.reserve(5), 5);
		slot.commit(5);
		// Lagging node still reports 5
		assert_eq!(slot.reserve(5), 6);
		// Node ahead of us: someone else used the account
		assert_eq!(slot.reserve(9), 9);
		slot.commit(3);
		assert_eq!(slot.last_issued(), Some(5));
	}

	#[test]
	fn test_uncommitted_nonce_is_reused() {
		let slot = NonceSlot::default();
		assert_eq!(slot.reserve(7), 7);
		assert_eq!(slot.reserve(7), 7);
	}

	#[tokio::test(start_paused = true)]
	async fn test_lock_serializes_per_account() {
		let manager = Arc::new(NonceManager::new());
		let account = Address::repeat_byte(0x11);

		let guard = manager.lock(account).await;

		let waiter = {
			let manager = manager.clone();
			tokio::spawn(async move {
				let mut slot = manager.lock(account).await;
				let nonce = slot.reserve(0);
				slot.commit(nonce);
				nonce
			})
		};

		// Other accounts are not blocked
		let _other = manager.lock(Address::repeat_byte(0x22)).await;

		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!waiter.is_finished());

		let mut guard = guard;
		guard.commit(0);
		drop(guard);

		assert_eq!(waiter.await.unwrap(), 1);
	}
}
