//! ABI encoding and decoding against a contract's JSON ABI.
//!
//! Arguments are dynamically typed (`DynSolValue`) and checked against the
//! declared parameter types before encoding. A mismatch is reported here,
//! before anything reaches the signer.

use crate::{ContractArtifact, ContractError};
use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi, Param};
use issuer_types::Bytes;

/// Finds a function by full signature (`transfer(address,uint256)`) or by a
/// name that is not overloaded.
pub fn resolve_function<'a>(
	abi: &'a JsonAbi,
	name_or_signature: &str,
) -> Result<&'a Function, ContractError> {
	if name_or_signature.contains('(') {
		let wanted: String = name_or_signature
			.chars()
			.filter(|c| !c.is_whitespace())
			.collect();
		return abi
			.functions()
			.find(|f| f.signature() == wanted)
			.ok_or_else(|| ContractError::Encoding(format!("Unknown function {}", wanted)));
	}

	match abi.function(name_or_signature).map(Vec::as_slice) {
		Some([function]) => Ok(function),
		Some(overloads) if !overloads.is_empty() => {
			let candidates: Vec<String> = overloads.iter().map(Function::signature).collect();
			Err(ContractError::Encoding(format!(
				"Function name '{}' is ambiguous; use one of: {}",
				name_or_signature,
				candidates.join(", ")
			)))
		}
		_ => Err(ContractError::Encoding(format!(
			"Unknown function {}",
			name_or_signature
		))),
	}
}

/// Creation bytecode followed by the ABI-encoded constructor arguments.
pub fn encode_deployment(
	artifact: &ContractArtifact,
	args: &[DynSolValue],
) -> Result<Bytes, ContractError> {
	let mut data = artifact.bytecode.to_vec();
	match artifact.abi.constructor() {
		Some(constructor) => {
			let encoded = constructor.abi_encode_input(args).map_err(|e| {
				ContractError::Encoding(format!("Constructor of {}: {}", artifact.name, e))
			})?;
			data.extend_from_slice(&encoded);
		}
		None if args.is_empty() => {}
		None => {
			return Err(ContractError::Encoding(format!(
				"{} has no constructor but {} argument(s) were given",
				artifact.name,
				args.len()
			)))
		}
	}
	Ok(Bytes::from(data))
}

/// Four-byte selector followed by the ABI-encoded arguments.
pub fn encode_call(function: &Function, args: &[DynSolValue]) -> Result<Bytes, ContractError> {
	function
		.abi_encode_input(args)
		.map(Bytes::from)
		.map_err(|e| ContractError::Encoding(format!("{}: {}", function.signature(), e)))
}

/// Decodes the return data of a call.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>, ContractError> {
	function.abi_decode_output(data).map_err(|e| {
		ContractError::Encoding(format!(
			"Cannot decode output of {}: {}",
			function.signature(),
			e
		))
	})
}

/// Coerces textual arguments into ABI values using the parameter types.
///
/// Accepts the forms a user types into a form field: decimal or hex integers,
/// `0x` addresses, `true`/`false`, and bracketed arrays.
pub fn coerce_args<S: AsRef<str>>(
	params: &[Param],
	args: &[S],
) -> Result<Vec<DynSolValue>, ContractError> {
	if params.len() != args.len() {
		return Err(ContractError::Encoding(format!(
			"Expected {} argument(s), got {}",
			params.len(),
			args.len()
		)));
	}

	params
		.iter()
		.zip(args)
		.enumerate()
		.map(|(i, (param, arg))| {
			let ty = param.resolve().map_err(|e| {
				ContractError::Encoding(format!("Unsupported parameter type {}: {}", param.ty, e))
			})?;
			ty.coerce_str(arg.as_ref().trim()).map_err(|e| {
				let label = if param.name.is_empty() {
					format!("#{}", i)
				} else {
					param.name.clone()
				};
				ContractError::Encoding(format!("Argument {} ({}): {}", label, param.ty, e))
			})
		})
		.collect()
}
