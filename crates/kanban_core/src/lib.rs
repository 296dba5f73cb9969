//! Core state engine for the kanban board.
//! This crate is the single source of truth for board and identity invariants.

pub mod clock;
pub mod config;
pub mod credential;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, KanbanConfig};
pub use credential::CredentialHash;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{
    Board, BoardId, BoardList, ListId, RecentList, Task, TaskId, TaskPatch,
};
pub use model::user::{User, UserId};
pub use repo::kv_store::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError, StorageResult,
};
pub use service::board_engine::{apply_command, BoardCommand, CommandOutcome};
pub use service::board_store::{AccessError, BoardStore, StoreError, StoreResult};
pub use service::board_views::{ViewScope, DEFAULT_RECENT_LIMIT};
pub use service::identity_store::{AuthError, IdentityStore};
pub use service::subscribers::SubscriptionId;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
