//! Redacting wrapper for private credentials.
//!
//! `PrivateCredential` holds the signing key material read from configuration.
//! Its memory is zeroed on drop, and it never renders the secret through
//! `Debug`, `Display` or serde serialization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// Private key material owned by a signer.
#[derive(Clone)]
pub struct PrivateCredential(Zeroizing<String>);

impl PrivateCredential {
	pub fn new(secret: impl Into<String>) -> Self {
		Self(Zeroizing::new(secret.into()))
	}

	/// Lends the secret to a closure.
	///
	/// This is the only way to read the value; keep the closure short and
	/// never let the borrowed string escape into logs or errors.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(self.0.trim())
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for PrivateCredential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PrivateCredential({})", REDACTED)
	}
}

impl fmt::Display for PrivateCredential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<&str> for PrivateCredential {
	fn from(s: &str) -> Self {
		Self::new(s)
	}
}

impl From<String> for PrivateCredential {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

// Serialized configuration must never carry the cleartext key.
impl Serialize for PrivateCredential {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for PrivateCredential {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(PrivateCredential::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[test]
	fn test_credential_is_redacted_everywhere() {
		let credential = PrivateCredential::from(KEY);

		let debug_str = format!("{:?}", credential);
		assert_eq!(debug_str, "PrivateCredential(***REDACTED***)");
		assert!(!format!("{}", credential).contains("ac0974"));

		let json = serde_json::to_string(&credential).unwrap();
		assert_eq!(json, "\"***REDACTED***\"");
	}

	#[test]
	fn test_with_exposed_trims_whitespace() {
		let credential = PrivateCredential::new(format!("  {}\n", KEY));
		let length = credential.with_exposed(|s| {
			assert_eq!(s, KEY);
			s.len()
		});
		assert_eq!(length, 66);
	}

	#[test]
	fn test_deserialize_and_empty() {
		let credential: PrivateCredential = serde_json::from_str("\"   \"").unwrap();
		assert!(credential.is_empty());

		let credential: PrivateCredential = serde_json::from_str(&format!("\"{}\"", KEY)).unwrap();
		assert!(!credential.is_empty());
	}
}
