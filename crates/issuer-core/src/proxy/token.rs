//! ERC-20 surface of the bundled token.

use super::ContractProxy;
use crate::lifecycle::TransactionOutcome;
use crate::IssuerError;
use alloy::dyn_abi::DynSolValue;
use issuer_types::{format_token_amount, parse_token_amount, Address, U256};

/// Typed access to an ERC-20 token.
///
/// Transfers are not checked against the sender's balance beforehand; a
/// short balance surfaces as a reverted outcome.
#[derive(Clone)]
pub struct TokenProxy {
	inner: ContractProxy,
}

impl TokenProxy {
	pub fn new(inner: ContractProxy) -> Self {
		Self { inner }
	}

	pub fn address(&self) -> Address {
		self.inner.address()
	}

	pub fn contract(&self) -> &ContractProxy {
		&self.inner
	}

	pub async fn balance_of(&self, holder: Address) -> Result<U256, IssuerError> {
		let output = self
			.inner
			.read("balanceOf", &[DynSolValue::Address(holder)])
			.await?;
		single_uint(output, "balanceOf")
	}

	pub async fn total_supply(&self) -> Result<U256, IssuerError> {
		let output = self.inner.read("totalSupply", &[]).await?;
		single_uint(output, "totalSupply")
	}

	pub async fn decimals(&self) -> Result<u8, IssuerError> {
		let output = self.inner.read("decimals", &[]).await?;
		let value = single_uint(output, "decimals")?;
		u8::try_from(value)
			.map_err(|_| IssuerError::Encoding(format!("decimals out of range: {}", value)))
	}

	pub async fn name(&self) -> Result<String, IssuerError> {
		let output = self.inner.read("name", &[]).await?;
		single_string(output, "name")
	}

	pub async fn symbol(&self) -> Result<String, IssuerError> {
		let output = self.inner.read("symbol", &[]).await?;
		single_string(output, "symbol")
	}

	/// Transfers `amount` base units to `to` and waits for the outcome.
	pub async fn transfer(
		&self,
		to: Address,
		amount: U256,
	) -> Result<TransactionOutcome, IssuerError> {
		self.inner
			.write(
				"transfer",
				vec![DynSolValue::Address(to), DynSolValue::Uint(amount, 256)],
			)
			.await
	}

	/// Renders base units as a decimal amount using the token's decimals.
	pub async fn format_amount(&self, amount: U256) -> Result<String, IssuerError> {
		Ok(format_token_amount(amount, self.decimals().await?))
	}

	/// Parses a decimal amount such as `"12.5"` into base units.
	pub async fn parse_amount(&self, amount: &str) -> Result<U256, IssuerError> {
		let decimals = self.decimals().await?;
		parse_token_amount(amount, decimals).ok_or_else(|| {
			IssuerError::Encoding(format!(
				"Invalid amount '{}' for a token with {} decimals",
				amount, decimals
			))
		})
	}
}

fn single_uint(output: Vec<DynSolValue>, function: &str) -> Result<U256, IssuerError> {
	match output.as_slice() {
		[value] => value.as_uint().map(|(value, _)| value),
		_ => None,
	}
	.ok_or_else(|| IssuerError::Encoding(format!("{} did not return a single integer", function)))
}

fn single_string(output: Vec<DynSolValue>, function: &str) -> Result<String, IssuerError> {
	match output.as_slice() {
		[value] => value.as_str().map(str::to_string),
		_ => None,
	}
	.ok_or_else(|| IssuerError::Encoding(format!("{} did not return a single string", function)))
}
