//! Common types module for the token issuer.
//!
//! This module defines the data model shared by every crate in the workspace:
//! chain context and gas policy, transaction records in their unsigned, signed
//! and mined forms, lifecycle events, and the configuration-schema machinery
//! used to validate implementation sections of the TOML configuration.

/// Chain context and gas policies.
pub mod chain;
/// Redacting wrapper for private credentials.
pub mod credential;
/// Lifecycle states and events published to front-ends.
pub mod events;
/// Registry trait for named implementations.
pub mod registry;
/// Transaction records: unsigned, signed and mined.
pub mod transaction;
/// Formatting and amount helpers.
pub mod utils;
/// Configuration validation types.
pub mod validation;

pub use chain::{ChainContext, GasLimits, GasPricePolicy, WEI_PER_GWEI};
pub use credential::PrivateCredential;
pub use events::{LifecycleEvent, TransactionState};
pub use registry::ImplementationRegistry;
pub use transaction::{
	SignatureParts, SignedTransaction, TransactionHash, TransactionKind, TransactionReceipt,
	UnsignedTransaction,
};
pub use utils::{
	format_token_amount, parse_token_amount, truncate_id, with_0x_prefix, without_0x_prefix,
};
pub use validation::{ConfigSchema, Field, FieldType, Schema, ValidationError};

pub use alloy_primitives::{Address, Bytes, B256, U256};
