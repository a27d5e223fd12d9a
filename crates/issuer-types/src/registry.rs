//! Registry trait for named implementations.
//!
//! Each pluggable component (account, gateway, compiler) exposes a `Registry`
//! struct per implementation, tying the name used under
//! `[<component>.implementations.<name>]` in the configuration to the factory
//! that builds it.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// Configuration key of the implementation, for example `"local"` for
	/// `[account.implementations.local]` or `"evm_alloy"` for the HTTP gateway.
	const NAME: &'static str;

	/// Factory function type, defined by each component crate.
	type Factory;

	/// Returns the factory that builds this implementation from its
	/// configuration section.
	fn factory() -> Self::Factory;
}
