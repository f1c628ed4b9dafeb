//! Key-value storage contracts, stored-value model, and in-memory adapters.

pub mod key_value;
pub mod value;
