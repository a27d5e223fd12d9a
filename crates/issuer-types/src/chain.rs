//! Chain context types.
//!
//! A `ChainContext` is established once from configuration and stays
//! immutable for the lifetime of the issuer. It carries the chain id every
//! transaction is bound to and the policies used to price and bound gas.

use serde::{Deserialize, Serialize};

/// Number of wei in one gwei.
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Strategy used to choose the gas price of a transaction.
///
/// Deserialized from a TOML table tagged by `policy`, for example
/// `{ policy = "fixed", gwei = 10 }` or `{ policy = "oracle", multiplier_percent = 125 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum GasPricePolicy {
	/// A constant price in gwei.
	Fixed {
		#[serde(default = "default_fixed_gwei")]
		gwei: u64,
	},
	/// The node's live `eth_gasPrice` quote, scaled by a percentage and
	/// optionally capped.
	Oracle {
		#[serde(default = "default_multiplier_percent")]
		multiplier_percent: u64,
		#[serde(default)]
		max_gwei: Option<u64>,
	},
}

fn default_fixed_gwei() -> u64 {
	10
}

fn default_multiplier_percent() -> u64 {
	100
}

impl Default for GasPricePolicy {
	fn default() -> Self {
		GasPricePolicy::Fixed {
			gwei: default_fixed_gwei(),
		}
	}
}

impl GasPricePolicy {
	/// Returns true when pricing needs a live quote from the node.
	pub fn requires_quote(&self) -> bool {
		matches!(self, GasPricePolicy::Oracle { .. })
	}

	/// Resolves the gas price in wei.
	///
	/// `quote` is the node's current gas price and is only consulted by the
	/// oracle policy; a missing quote under that policy resolves to `None`.
	pub fn resolve(&self, quote: Option<u128>) -> Option<u128> {
		match *self {
			GasPricePolicy::Fixed { gwei } => Some(gwei as u128 * WEI_PER_GWEI),
			GasPricePolicy::Oracle {
				multiplier_percent,
				max_gwei,
			} => {
				let scaled = quote?.saturating_mul(multiplier_percent as u128) / 100;
				Some(match max_gwei {
					Some(cap) => scaled.min(cap as u128 * WEI_PER_GWEI),
					None => scaled,
				})
			}
		}
	}
}

/// Upper bounds on gas per operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasLimits {
	/// Ceiling used for contract deployments.
	#[serde(default = "default_deploy_limit")]
	pub deploy_limit: u64,
	/// Ceiling used for calls on a deployed contract.
	#[serde(default = "default_call_limit")]
	pub call_limit: u64,
}

fn default_deploy_limit() -> u64 {
	3_000_000
}

fn default_call_limit() -> u64 {
	100_000
}

impl Default for GasLimits {
	fn default() -> Self {
		Self {
			deploy_limit: default_deploy_limit(),
			call_limit: default_call_limit(),
		}
	}
}

/// Immutable per-process view of the target chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainContext {
	/// EIP-155 chain id every transaction is signed for.
	pub chain_id: u64,
	/// How gas price is chosen.
	pub gas_price: GasPricePolicy,
	/// Gas ceilings per operation class.
	pub gas_limits: GasLimits,
}

impl ChainContext {
	pub fn new(chain_id: u64, gas_price: GasPricePolicy, gas_limits: GasLimits) -> Self {
		Self {
			chain_id,
			gas_price,
			gas_limits,
		}
	}
}
