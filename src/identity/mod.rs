//! Identity records and the store that resolves them.
//!
//! Identity records belong to an external user database. This crate only
//! needs to read them: to authenticate a login, to resolve the subject of a
//! session credential, and to echo a sanitized copy back to the client.

mod store;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub use store::{hash_password, verify_password, IdentityStore, MemoryIdentityStore};

fn default_role() -> String {
    "user".to_string()
}

fn default_active() -> bool {
    true
}

/// An authenticated user's account record.
///
/// Field names follow the upstream user collection (camelCase, `_id`
/// accepted as an alias for `id`). Timestamps are Unix seconds.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    pub email: String,

    /// Argon2 PHC string (`$argon2id$v=19$...`)
    #[serde(rename = "password")]
    pub password_hash: String,

    #[serde(default = "default_role")]
    pub role: String,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub password_changed_at: Option<u64>,

    #[serde(default)]
    pub created_at: Option<u64>,

    #[serde(default)]
    pub updated_at: Option<u64>,

    #[serde(default)]
    pub profile_image: Option<String>,

    #[serde(default)]
    pub profile_image_id: Option<String>,

    #[serde(default)]
    pub cover_image: Option<String>,

    #[serde(default)]
    pub cover_image_id: Option<String>,
}

impl Identity {
    /// Create an active identity with the default role and no timestamps.
    ///
    /// `password_hash` is stored as given; see [`Identity::with_password`].
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: email.into(),
            password_hash: password_hash.into(),
            role: default_role(),
            active: true,
            password_changed_at: None,
            created_at: None,
            updated_at: None,
            profile_image: None,
            profile_image_id: None,
            cover_image: None,
            cover_image_id: None,
        }
    }

    /// Like [`Identity::new`], hashing `password` first.
    pub fn with_password(
        id: impl Into<String>,
        email: impl Into<String>,
        password: &str,
    ) -> Result<Self, SessionError> {
        Ok(Self::new(id, email, hash_password(password)?))
    }

    /// Whether the password was changed after a credential issued at `issued_at`.
    pub fn changed_password_after(&self, issued_at: u64) -> bool {
        self.password_changed_at
            .map(|changed| changed > issued_at)
            .unwrap_or(false)
    }

    /// Build the copy of this record that is safe to send to the client.
    ///
    /// The record itself is left untouched.
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity::from(self)
    }
}

// The credential hash never reaches logs.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Response copy of an [`Identity`] with every sensitive field removed.
///
/// Credential hash, role, activity flag, timestamps and image storage ids
/// have no counterpart here, so they cannot be serialized by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl From<&Identity> for PublicIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            profile_image: identity.profile_image.clone(),
            cover_image: identity.cover_image.clone(),
        }
    }
}
