//! Salted one-way credential hashing.
//!
//! # Responsibility
//! - Derive a PBKDF2-HMAC-SHA256 key from a user secret and a fresh salt.
//! - Verify a candidate secret against a stored record in constant time.
//!
//! # Invariants
//! - The plaintext secret is never stored or logged.
//! - Verification uses the iteration count recorded at hashing time.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Algorithm tag stored alongside each hash record.
pub const CREDENTIAL_ALGORITHM: &str = "pbkdf2-sha256";
/// Iteration count used when the config does not override it.
pub const DEFAULT_CREDENTIAL_ITERATIONS: u32 = 100_000;
const DERIVED_KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const DECOY_SALT: [u8; SALT_LEN] = *b"kanban-no-user!!";

/// Persisted credential material for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHash {
    pub algorithm: String,
    pub iterations: u32,
    /// Base64-encoded salt.
    pub salt: String,
    /// Base64-encoded derived key.
    pub hash: String,
}

impl CredentialHash {
    /// Hashes `secret` with a freshly generated salt.
    ///
    /// `iterations` below 1 are clamped to 1.
    pub fn derive(secret: &str, iterations: u32) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let iterations = iterations.max(1);
        let key = derive_key(secret, &salt, iterations);
        Self {
            algorithm: CREDENTIAL_ALGORITHM.to_string(),
            iterations,
            salt: B64.encode(salt),
            hash: B64.encode(key),
        }
    }

    /// Returns whether `secret` matches this record.
    ///
    /// Malformed records (unknown algorithm, undecodable salt/hash) never match.
    pub fn verify(&self, secret: &str) -> bool {
        if self.algorithm != CREDENTIAL_ALGORITHM {
            return false;
        }
        let (Ok(salt), Ok(expected)) = (B64.decode(&self.salt), B64.decode(&self.hash)) else {
            return false;
        };
        let candidate = derive_key(secret, &salt, self.iterations.max(1));
        constant_time_eq(&candidate, &expected)
    }

    /// Spends one derivation's worth of work for an account that does not exist.
    ///
    /// Always `false`; keeps unknown-email logins as slow as wrong-secret ones.
    pub fn verify_missing(secret: &str, iterations: u32) -> bool {
        let candidate = derive_key(secret, &DECOY_SALT, iterations.max(1));
        let _ = constant_time_eq(&candidate, &[0u8; DERIVED_KEY_LEN]);
        false
    }
}

fn derive_key(secret: &str, salt: &[u8], iterations: u32) -> [u8; DERIVED_KEY_LEN] {
    let mut key = [0u8; DERIVED_KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, iterations, &mut key);
    key
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
