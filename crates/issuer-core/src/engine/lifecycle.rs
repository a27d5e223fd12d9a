//! Startup checks for the issuer.

use super::Issuer;
use crate::IssuerError;

impl Issuer {
	/// Verifies the node serves the configured chain.
	///
	/// Run once before the first operation; every transaction is signed for
	/// the configured chain id and would be rejected by a node on another one.
	pub async fn initialize(&self) -> Result<(), IssuerError> {
		tracing::info!(address = %self.address, "Initializing issuer");

		let expected = self.config.network.chain_id;
		let reported = self.gateway.get_chain_id().await?;
		if reported != expected {
			tracing::error!(expected, reported, "Chain id mismatch");
			return Err(IssuerError::Config(format!(
				"Node reports chain id {} but the configuration expects {}",
				reported, expected
			)));
		}

		tracing::info!(chain_id = reported, "Connected to node");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::test_support::issuer;
	use crate::{ErrorKind, IssuerError};
	use issuer_gateway::implementations::mock::MockGateway;

	#[tokio::test]
	async fn test_initialize_accepts_matching_chain() {
		let node = MockGateway::default();
		issuer(&node).initialize().await.unwrap();
	}

	#[tokio::test]
	async fn test_initialize_detects_chain_mismatch() {
		let node = MockGateway::new(1);
		let err = issuer(&node).initialize().await.unwrap_err();
		assert!(matches!(err, IssuerError::Config(_)));
		assert!(err.to_string().contains("chain id 1"));
	}

	#[tokio::test]
	async fn test_initialize_reports_unreachable_node() {
		let node = MockGateway::default();
		node.set_unreachable(true);
		let err = issuer(&node).initialize().await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Transient);
	}
}
