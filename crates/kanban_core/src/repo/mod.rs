//! Persistence boundary for both stores.
//!
//! # Responsibility
//! - Hide the storage medium behind the `KeyValueStore` contract.
//! - Own JSON record encoding and malformed-record recovery.

pub mod kv_store;
