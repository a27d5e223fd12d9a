//! String formatting utilities.
//!
//! Hex prefix handling, hash truncation for logs, and conversion between
//! on-chain token units and human-readable decimal amounts.

use alloy_primitives::U256;

/// Truncates a hex string for log output.
///
/// Shows only the first 10 characters (the `0x` prefix plus 8 digits)
/// followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Formats a raw on-chain token amount with decimal places for display.
///
/// `format_token_amount(U256::from(1_500_000u64), 6)` yields `"1.5"`.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	let amount = amount.to_string();
	if decimals == 0 {
		return amount;
	}

	let decimal_places = decimals as usize;

	let (integer_part, decimal_part) = if amount.len() <= decimal_places {
		let decimal_str = format!("{:0>width$}", amount, width = decimal_places);
		("0".to_string(), decimal_str)
	} else {
		let split_pos = amount.len() - decimal_places;
		(
			amount[..split_pos].to_string(),
			amount[split_pos..].to_string(),
		)
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');

	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}

/// Parses a human-readable token amount into on-chain units.
///
/// `parse_token_amount("100", 18)` yields `100 * 10^18`. Returns `None` for
/// malformed input, more fractional digits than `decimals`, or overflow.
pub fn parse_token_amount(amount: &str, decimals: u8) -> Option<U256> {
	let amount = amount.trim();
	let (integer_part, fraction_part) = match amount.split_once('.') {
		Some((int, frac)) => (int, frac),
		None => (amount, ""),
	};

	if integer_part.is_empty() && fraction_part.is_empty() {
		return None;
	}
	if fraction_part.len() > decimals as usize {
		return None;
	}
	let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
	if !all_digits(integer_part) || !all_digits(fraction_part) {
		return None;
	}

	let padded = format!(
		"{}{:0<width$}",
		integer_part,
		fraction_part,
		width = decimals as usize
	);
	let digits = padded.trim_start_matches('0');
	if digits.is_empty() {
		return Some(U256::ZERO);
	}
	U256::from_str_radix(digits, 10).ok()
}
