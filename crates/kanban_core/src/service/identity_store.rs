//! Identity store: registered users and the active session.
//!
//! # Responsibility
//! - Register users with unique emails and salted credential hashes.
//! - Authenticate, hold, and clear the single active session.
//!
//! # Invariants
//! - Emails are unique under exact, case-sensitive comparison.
//! - A rejected registration never alters existing user records.
//! - The session record stores only a user id; a dangling id loads as no session.
//! - Emails and credentials never appear in log events.

use crate::config::KanbanConfig;
use crate::credential::CredentialHash;
use crate::model::user::{User, UserId};
use crate::repo::kv_store::{load_json_record, save_json_record, KeyValueStore, StorageError};
use crate::service::subscribers::{SubscriptionId, Subscribers};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identity store failures.
#[derive(Debug)]
pub enum AuthError {
    /// Registration email is already taken.
    DuplicateEmail,
    /// No stored user matches both email and credential.
    InvalidCredentials,
    /// Loading or persisting identity records failed.
    Storage(StorageError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEmail => write!(f, "email already registered"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    user_id: UserId,
}

/// User set plus active session over a key-value medium.
pub struct IdentityStore<S: KeyValueStore> {
    storage: S,
    users_key: String,
    session_key: String,
    credential_iterations: u32,
    users: Vec<User>,
    current: Option<User>,
    subscribers: Subscribers<Option<User>>,
}

impl<S: KeyValueStore> IdentityStore<S> {
    /// Loads users and the session record; absent or malformed records are empty.
    pub fn open(storage: S, config: &KanbanConfig) -> Result<Self, AuthError> {
        let users: Vec<User> = load_json_record(&storage, &config.users_key)?;
        let session: Option<SessionRecord> = load_json_record(&storage, &config.session_key)?;

        let current = session.and_then(|record| {
            let resolved = users.iter().find(|user| user.id == record.user_id).cloned();
            if resolved.is_none() {
                warn!(
                    "event=session_restore module=identity status=recovered user_id={} reason=unknown_user",
                    record.user_id
                );
            }
            resolved
        });

        info!(
            "event=identity_store_open module=identity status=ok users={} session={}",
            users.len(),
            current.is_some()
        );
        Ok(Self {
            storage,
            users_key: config.users_key.clone(),
            session_key: config.session_key.clone(),
            credential_iterations: config.credential_iterations,
            users,
            current,
            subscribers: Subscribers::default(),
        })
    }

    /// Active session holder, if any.
    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// Every registered user, in registration order.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, user_id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    /// Registers a listener called with the session holder after every session change.
    pub fn subscribe(&mut self, listener: impl Fn(&Option<User>) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Creates a user and makes it the active session.
    ///
    /// # Errors
    /// - `DuplicateEmail` when `email` is already registered.
    /// - `Storage` when the user set or the session cannot be persisted; the
    ///   user is not kept in memory or on disk.
    pub fn register(
        &mut self,
        email: &str,
        credential: &str,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        if self.users.iter().any(|user| user.email == email) {
            warn!("event=auth_register module=identity status=rejected reason=duplicate_email");
            return Err(AuthError::DuplicateEmail);
        }

        let user = User::new(
            email,
            CredentialHash::derive(credential, self.credential_iterations),
            display_name.map(str::to_string),
        );
        self.users.push(user.clone());
        if let Err(err) = save_json_record(&self.storage, &self.users_key, &self.users) {
            self.users.pop();
            error!(
                "event=auth_register module=identity status=error error_code=persist_failed error={err}"
            );
            return Err(err.into());
        }

        if let Err(err) = self.start_session(&user) {
            self.users.pop();
            if let Err(revert_err) = save_json_record(&self.storage, &self.users_key, &self.users) {
                error!(
                    "event=auth_register module=identity status=error error_code=revert_failed error={revert_err}"
                );
            }
            error!(
                "event=auth_register module=identity status=error error_code=session_persist_failed error={err}"
            );
            return Err(err);
        }
        info!(
            "event=auth_register module=identity status=ok user_id={} users={}",
            user.id,
            self.users.len()
        );
        Ok(user)
    }

    /// Authenticates and makes the matching user the active session.
    pub fn login(&mut self, email: &str, credential: &str) -> Result<User, AuthError> {
        let verified = match self.users.iter().find(|user| user.email == email) {
            Some(user) => user.credential.verify(credential).then(|| user.clone()),
            None => {
                CredentialHash::verify_missing(credential, self.credential_iterations);
                None
            }
        };
        let Some(user) = verified else {
            warn!("event=auth_login module=identity status=rejected reason=invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        self.start_session(&user)?;
        info!(
            "event=auth_login module=identity status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Clears the active session. Idempotent.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.storage.remove(&self.session_key)?;
        let had_session = self.current.take().is_some();
        info!("event=auth_logout module=identity status=ok had_session={had_session}");
        self.subscribers.notify(&self.current);
        Ok(())
    }

    fn start_session(&mut self, user: &User) -> Result<(), AuthError> {
        save_json_record(
            &self.storage,
            &self.session_key,
            &SessionRecord { user_id: user.id },
        )?;
        self.current = Some(user.clone());
        self.subscribers.notify(&self.current);
        Ok(())
    }
}
