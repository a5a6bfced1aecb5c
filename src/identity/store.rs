//! Identity lookup seam and an in-memory implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use argon2::{
    password_hash::rand_core::OsRng,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::Identity;
use crate::error::{ConfigError, SessionError};

/// Source of identity records.
///
/// Implementations wrap whatever user database the deployment uses; the
/// session guard and login handler only go through this trait.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an identity by its unique id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, SessionError>;

    /// Check an email/password pair, returning the identity on success.
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Identity>, SessionError>;
}

/// Hash a password into an Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, SessionError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| SessionError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string.
///
/// A stored value that does not parse as a PHC string never matches.
pub fn verify_password(password: &str, phc: &str) -> bool {
    let parsed = match PasswordHash::new(phc) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "Stored password hash is not a PHC string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash checked for unknown emails, so both login failures cost one verification.
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("media-gate decoy password").unwrap_or_default())
}

/// Identity store backed by a map held in memory.
#[derive(Default)]
pub struct MemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for seeding.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities
            .get_mut()
            .insert(identity.id.clone(), identity);
        self
    }

    /// Insert or replace an identity.
    pub async fn insert(&self, identity: Identity) {
        self.identities
            .write()
            .await
            .insert(identity.id.clone(), identity);
    }

    /// Load a JSON array of identity records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let to_err = |reason: String| ConfigError::Identities {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| to_err(e.to_string()))?;
        let records: Vec<Identity> =
            serde_json::from_str(&raw).map_err(|e| to_err(e.to_string()))?;

        let identities = records
            .into_iter()
            .map(|identity| (identity.id.clone(), identity))
            .collect();

        Ok(Self {
            identities: RwLock::new(identities),
        })
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, SessionError> {
        Ok(self.identities.read().await.get(id).cloned())
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Identity>, SessionError> {
        let found = self
            .identities
            .read()
            .await
            .values()
            .find(|identity| identity.email.eq_ignore_ascii_case(email))
            .cloned();

        let stored = match found {
            Some(ref identity) => identity.password_hash.clone(),
            None => decoy_hash().to_string(),
        };
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;

        match found {
            Some(identity) if matches => Ok(Some(identity)),
            Some(_) => {
                debug!(email = email, "Password mismatch");
                Ok(None)
            }
            None => {
                debug!(email = email, "No identity with this email");
                Ok(None)
            }
        }
    }
}
