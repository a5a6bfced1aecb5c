//! Session credential issuance.
//!
//! A session credential is an HS256 JWT carrying only the identity id plus
//! issued-at and expiry timestamps. It travels to the client in the
//! `auth_token` cookie and comes back either in that cookie or in an
//! `Authorization: Bearer` header.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use axum::http::StatusCode;
//! use media_gate::auth::session::{SessionConfig, TokenIssuer};
//! use media_gate::identity::Identity;
//!
//! let issuer = TokenIssuer::new(&SessionConfig::new("jwt-secret", Duration::from_secs(7200)));
//! let identity = Identity::with_password("u1", "ada@example.com", "hunter2").unwrap();
//! let response = issuer.issue(&identity, StatusCode::OK);
//! assert!(response.headers().contains_key("set-cookie"));
//! ```

use std::time::Duration;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::clock::{system_clock, SharedClock};
use crate::error::SessionError;
use crate::identity::Identity;

/// Name of the cookie carrying the session credential.
pub const AUTH_COOKIE: &str = "auth_token";

/// Default credential lifetime (2 hours).
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(2 * 3600);

// =============================================================================
// Configuration
// =============================================================================

/// Immutable settings for [`TokenIssuer`], built once at startup.
#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC secret for signing credentials
    pub secret: String,

    /// How long a credential (and its cookie) stays valid
    pub lifetime: Duration,

    /// Mark the cookie `Secure` (production deployments)
    pub secure_cookie: bool,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            lifetime,
            secure_cookie: false,
        }
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}

// =============================================================================
// Claims
// =============================================================================

/// Payload of a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity id
    pub id: String,

    /// Issued at (Unix seconds)
    pub iat: u64,

    /// Expiry (Unix seconds)
    pub exp: u64,
}

// =============================================================================
// Token Issuer
// =============================================================================

/// Mints and verifies session credentials.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secret_is_empty: bool,
    lifetime: Duration,
    secure_cookie: bool,
    clock: SharedClock,
}

impl TokenIssuer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            secret_is_empty: config.secret.is_empty(),
            lifetime: config.lifetime,
            secure_cookie: config.secure_cookie,
            clock: system_clock(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a credential for `identity`.
    ///
    /// Only the identity id is embedded.
    pub fn mint(&self, identity: &Identity) -> Result<String, SessionError> {
        if self.secret_is_empty {
            return Err(SessionError::SigningFailure(
                "signing secret is empty".to_string(),
            ));
        }

        let iat = self.clock.now_secs();
        let claims = SessionClaims {
            id: identity.id.clone(),
            iat,
            exp: iat + self.lifetime.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::SigningFailure(e.to_string()))
    }

    /// Issue a session for `identity` and build the complete response.
    ///
    /// On success the response carries exactly one `Set-Cookie` header and a
    /// JSON body with the sanitized identity. If signing fails the response
    /// is a 500 error and no cookie is set.
    pub fn issue(&self, identity: &Identity, status: StatusCode) -> Response {
        match self.try_issue(identity, status) {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    fn try_issue(&self, identity: &Identity, status: StatusCode) -> Result<Response, SessionError> {
        let token = self.mint(identity)?;
        let cookie = self.session_cookie(&token)?;

        info!(identity = %identity.id, "Issued session credential");

        let body = json!({
            "status": "success",
            "data": {
                "user": identity.to_public(),
            },
        });

        let mut response = (status, Json(body)).into_response();
        response.headers_mut().insert(header::SET_COOKIE, cookie);
        Ok(response)
    }

    /// Build the `Set-Cookie` value carrying `token`.
    pub fn session_cookie(&self, token: &str) -> Result<HeaderValue, SessionError> {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly",
            AUTH_COOKIE,
            token,
            self.lifetime.as_secs()
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie).map_err(|e| SessionError::SigningFailure(e.to_string()))
    }

    /// Decode and check a credential.
    ///
    /// A credential presented at exactly its expiry second is rejected.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock.
        validation.validate_exp = false;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!(error = %e, "Rejected session credential");
                SessionError::InvalidToken
            })?
            .claims;

        let current_time = self.clock.now_secs();
        if current_time >= claims.exp {
            return Err(SessionError::TokenExpired {
                expired_at: claims.exp,
                current_time,
            });
        }

        Ok(claims)
    }
}

// =============================================================================
// Cookie Helpers
// =============================================================================

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "auth_token=; Max-Age=0; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly",
    )
}

/// Read a cookie value from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Find the session credential: the `auth_token` cookie first, then a bearer token.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, AUTH_COOKIE).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

// =============================================================================
// Tests
// =============================================================================
