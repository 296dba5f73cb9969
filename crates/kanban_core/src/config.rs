//! Runtime configuration for the kanban stores.
//!
//! # Responsibility
//! - Name the storage records each store owns.
//! - Carry tunables (recent-view size, credential work factor, log level).
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - The three record keys are non-blank and pairwise distinct.

use crate::credential::DEFAULT_CREDENTIAL_ITERATIONS;
use crate::logging::default_log_level;
use crate::service::board_views::DEFAULT_RECENT_LIMIT;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KanbanConfig {
    /// Record holding the serialized board tree.
    pub boards_key: String,
    /// Record holding the registered-user set.
    pub users_key: String,
    /// Record holding the active session's user id.
    pub session_key: String,
    /// Entry count returned by the recent-lists view.
    pub recent_limit: usize,
    /// PBKDF2 iterations for newly hashed credentials.
    pub credential_iterations: u32,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            boards_key: "kanban_boards".to_string(),
            users_key: "kanban_users".to_string(),
            session_key: "kanban_current_user".to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            credential_iterations: DEFAULT_CREDENTIAL_ITERATIONS,
            log_level: default_log_level().to_string(),
        }
    }
}

impl KanbanConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let keys = [
            ("boards_key", self.boards_key.as_str()),
            ("users_key", self.users_key.as_str()),
            ("session_key", self.session_key.as_str()),
        ];
        for (name, key) in keys {
            if key.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be blank")));
            }
        }
        if keys[0].1 == keys[1].1 || keys[0].1 == keys[2].1 || keys[1].1 == keys[2].1 {
            return Err(ConfigError::Invalid(
                "record keys must be distinct".to_string(),
            ));
        }
        if self.credential_iterations == 0 {
            return Err(ConfigError::Invalid(
                "credential_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
