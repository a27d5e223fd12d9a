//! Bundled MemeCoin ERC-20 token.
//!
//! A minimal fixed-supply token: the constructor mints `initialSupply` whole
//! tokens (scaled by 18 decimals) to the deployer, and `transfer` reverts
//! with "Not enough balance" when the sender is short.

use crate::ContractError;
use alloy::json_abi::JsonAbi;

/// Solidity source of the token.
pub const MEMECOIN_SOURCE: &str = include_str!("../contracts/MemeCoin.sol");

/// ABI of the token, matching what solc emits for `MEMECOIN_SOURCE`.
pub const MEMECOIN_ABI_JSON: &str = include_str!("../contracts/MemeCoin.abi.json");

pub const TOKEN_CONTRACT_NAME: &str = "MemeCoin";

pub const TOKEN_DECIMALS: u8 = 18;

/// Whole tokens minted at deployment unless configured otherwise.
pub const DEFAULT_INITIAL_SUPPLY: u64 = 1_000_000;

/// Parses the bundled ABI.
pub fn memecoin_abi() -> Result<JsonAbi, ContractError> {
	serde_json::from_str(MEMECOIN_ABI_JSON)
		.map_err(|e| ContractError::Artifact(format!("Bundled MemeCoin ABI is invalid: {}", e)))
}
