//! Board tree and identity domain model.
//!
//! # Responsibility
//! - Define the canonical records owned by the board and identity stores.
//! - Keep the persisted JSON shape stable across store reloads.
//!
//! # Invariants
//! - Every entity is identified by a UUID v4 generated at creation time.
//! - A task belongs to exactly one list, a list to exactly one board.

pub mod board;
pub mod user;
