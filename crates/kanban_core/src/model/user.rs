//! Registered user model.
//!
//! # Invariants
//! - `email` is unique across the user set (exact, case-sensitive match).
//! - Users are never mutated after registration.
//! - Only the salted credential hash is stored, never the secret itself.

use crate::credential::CredentialHash;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable user identifier; also the board ownership key.
pub type UserId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub credential: CredentialHash,
}

impl User {
    /// Creates a user with a generated stable ID.
    pub fn new(
        email: impl Into<String>,
        credential: CredentialHash,
        display_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name,
            credential,
        }
    }

    /// Name shown in UI greetings: display name when set, email otherwise.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.email.as_str())
    }
}
