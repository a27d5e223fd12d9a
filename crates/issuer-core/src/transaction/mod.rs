//! Transaction intents and the builder that turns them into unsigned
//! transactions.

mod builder;
mod intent;

pub use builder::{EncodedIntent, TransactionBuilder};
pub use intent::TransactionIntent;
