//! Board and identity stores plus the pure logic they wrap.
//!
//! # Responsibility
//! - `board_engine`/`board_views`: storage-free tree transformation and views.
//! - `board_store`/`identity_store`: persist-then-notify wrappers owning state.

pub mod board_engine;
pub mod board_store;
pub mod board_views;
pub mod identity_store;
pub mod subscribers;
