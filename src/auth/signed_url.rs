//! Signed URL authorization for protected media.
//!
//! This module provides HMAC-SHA256 based URL signing for short-lived access
//! to video assets.
//!
//! # URL Signing Scheme
//!
//! URLs are signed by computing an HMAC-SHA256 over the path and query parameters
//! (excluding `sig`). This binds signatures to the full request path and query:
//!
//! ```text
//! signature = HMAC-SHA256(secret_key, "{path}?{canonical_query}")
//! ```
//!
//! The canonical query is every `key=value` pair except `sig`, sorted by key
//! then value. Minted URLs carry the resource reference, the grantee's
//! identity id, and the expiry:
//!
//! ```text
//! /authenticated/videoUrl?resource=video%2F123&uid=u1&exp=1735689600&sig=abc123...
//! ```
//!
//! # Security Properties
//!
//! - **Path + query binding**: changing the resource, grantee or expiry invalidates the URL
//! - **Time-limited**: a URL presented at or after its expiry second is rejected
//! - **Stateless**: validity depends only on the signature and the expiry
//! - **Constant-time comparison**: signatures are compared with `subtle`
//!
//! # Example
//!
//! ```rust
//! use media_gate::auth::signed_url::SignedUrlAuth;
//! use std::time::Duration;
//!
//! let auth = SignedUrlAuth::new("my-secret-key");
//!
//! let path = "/authenticated/videoUrl";
//! let params = [("resource", "video/123")];
//! let (signature, expiry) = auth.sign_with_params(path, Duration::from_secs(60), &params);
//!
//! assert!(auth.verify(path, &signature, expiry, &params).is_ok());
//! ```

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;
use url::form_urlencoded;

use crate::clock::{system_clock, SharedClock};
use crate::error::UrlAuthError;
use crate::identity::Identity;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Path that redeems signed media URLs.
pub const VIDEO_URL_PATH: &str = "/authenticated/videoUrl";

/// Query parameter naming the protected resource.
pub const RESOURCE_PARAM: &str = "resource";

/// Query parameter naming the identity the URL was minted for.
pub const GRANTEE_PARAM: &str = "uid";

/// Default lifetime of a minted URL (1 hour).
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Immutable settings for [`SignedUrlAuth`], built once at startup.
#[derive(Clone)]
pub struct SignedUrlConfig {
    /// Secret key for HMAC computation
    pub secret: String,

    /// Lifetime of minted URLs
    pub ttl: Duration,

    /// Scheme and authority prepended to minted URLs (e.g. "https://api.example.com")
    pub public_base_url: String,
}

impl SignedUrlConfig {
    pub fn new(secret: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: DEFAULT_SIGNED_URL_TTL,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A minted capability URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    /// Full URL including `exp` and `sig`
    pub url: String,

    /// Resource the URL grants access to
    pub resource: String,

    /// Expiry (Unix seconds)
    pub expires_at: u64,
}

/// Result of redeeming a signed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    /// Resource to stream
    pub resource: String,

    /// Identity id the URL was minted for, if the URL names one
    pub grantee: Option<String>,

    /// Expiry (Unix seconds)
    pub expires_at: u64,
}

// =============================================================================
// Signed URL Authentication
// =============================================================================

/// Signed URL authenticator using HMAC-SHA256.
///
/// This struct provides methods for generating and verifying signed URLs.
/// The signing scheme binds signatures to paths, query params, and expiry times.
#[derive(Clone)]
pub struct SignedUrlAuth {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,

    /// Lifetime used by [`SignedUrlAuth::mint`]
    ttl: Duration,

    /// Prefix for minted URLs
    base_url: String,

    clock: SharedClock,
}

impl SignedUrlAuth {
    /// Create a new authenticator with the given secret key.
    ///
    /// Uses the default TTL, an empty base URL (minted URLs are
    /// path-relative) and the system clock.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            ttl: DEFAULT_SIGNED_URL_TTL,
            base_url: String::new(),
            clock: system_clock(),
        }
    }

    pub fn from_config(config: &SignedUrlConfig) -> Self {
        Self::new(&config.secret)
            .with_ttl(config.ttl)
            .with_base_url(&config.public_base_url)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // -------------------------------------------------------------------------
    // Minting
    // -------------------------------------------------------------------------

    /// Mint a URL granting `requester` access to `resource` for the configured TTL.
    ///
    /// The caller must already have checked the requester's session.
    pub fn mint(&self, resource: &str, requester: &Identity) -> Result<SignedUrl, UrlAuthError> {
        let resource = resource.trim();
        if resource.is_empty() {
            return Err(UrlAuthError::MissingResource);
        }

        let expiry = self.clock.now_secs() + self.ttl.as_secs();
        let params = [(RESOURCE_PARAM, resource), (GRANTEE_PARAM, requester.id.as_str())];
        let url = self.signed_url_with_expiry(&self.base_url, VIDEO_URL_PATH, expiry, &params);

        debug!(
            resource = resource,
            grantee = %requester.id,
            expires_at = expiry,
            "Minted signed URL"
        );

        Ok(SignedUrl {
            url,
            resource: resource.to_string(),
            expires_at: expiry,
        })
    }

    /// Sign a path with an expiry duration.
    ///
    /// Returns the hex-encoded signature and the expiry timestamp (Unix epoch seconds).
    pub fn sign(&self, path: &str, ttl: Duration) -> (String, u64) {
        self.sign_with_params(path, ttl, &[])
    }

    /// Sign a path with extra query parameters.
    ///
    /// `params` should exclude `exp` and `sig`; those are added automatically.
    pub fn sign_with_params(
        &self,
        path: &str,
        ttl: Duration,
        params: &[(&str, &str)],
    ) -> (String, u64) {
        let expiry = self.clock.now_secs() + ttl.as_secs();
        let signature = self.compute_signature(path, expiry, params);
        (signature, expiry)
    }

    /// Sign a path with a specific expiry timestamp.
    pub fn sign_with_expiry(&self, path: &str, expiry: u64) -> String {
        self.sign_with_expiry_and_params(path, expiry, &[])
    }

    /// Sign a path with a specific expiry timestamp and extra parameters.
    ///
    /// `params` should exclude `exp` and `sig`; those are added automatically.
    pub fn sign_with_expiry_and_params(
        &self,
        path: &str,
        expiry: u64,
        params: &[(&str, &str)],
    ) -> String {
        self.compute_signature(path, expiry, params)
    }

    /// Generate a complete signed URL valid for `ttl`.
    pub fn generate_signed_url(
        &self,
        base_url: &str,
        path: &str,
        ttl: Duration,
        extra_params: &[(&str, &str)],
    ) -> String {
        let expiry = self.clock.now_secs() + ttl.as_secs();
        self.signed_url_with_expiry(base_url, path, expiry, extra_params)
    }

    /// Build a complete signed URL with a specific expiry timestamp.
    pub fn signed_url_with_expiry(
        &self,
        base_url: &str,
        path: &str,
        expiry: u64,
        extra_params: &[(&str, &str)],
    ) -> String {
        let signature = self.compute_signature(path, expiry, extra_params);

        let mut url = format!("{}{}", base_url.trim_end_matches('/'), path);

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in extra_params {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("exp", &expiry.to_string());
        serializer.append_pair("sig", &signature);

        url.push('?');
        url.push_str(&serializer.finish());

        url
    }

    // -------------------------------------------------------------------------
    // Verification
    // -------------------------------------------------------------------------

    /// Verify a signature for a path, expiry and extra parameters.
    ///
    /// The signature is checked before the expiry, so a forged URL is never
    /// reported as merely expired. The expiry second itself is already expired.
    pub fn verify(
        &self,
        path: &str,
        signature: &str,
        expiry: u64,
        params: &[(&str, &str)],
    ) -> Result<(), UrlAuthError> {
        let provided_sig =
            hex::decode(signature).map_err(|_| UrlAuthError::InvalidSignatureFormat)?;

        let expected_sig = self.compute_mac(path, expiry, params);

        if !bool::from(provided_sig.ct_eq(&expected_sig)) {
            return Err(UrlAuthError::InvalidSignature);
        }

        let current_time = self.clock.now_secs();
        if current_time >= expiry {
            return Err(UrlAuthError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        Ok(())
    }

    /// Redeem an incoming request's path and raw query string.
    ///
    /// Duplicate `sig` or `exp` parameters are rejected as malformed.
    pub fn verify_request(&self, path: &str, query: &str) -> Result<ResourceHandle, UrlAuthError> {
        let mut signature: Option<String> = None;
        let mut expiry: Option<u64> = None;
        let mut extra_params: Vec<(String, String)> = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key == "sig" {
                if signature.is_some() {
                    return Err(UrlAuthError::InvalidSignatureFormat);
                }
                signature = Some(value.into_owned());
                continue;
            }
            if key == "exp" {
                if expiry.is_some() {
                    return Err(UrlAuthError::InvalidExpiryFormat);
                }
                let parsed = value
                    .parse::<u64>()
                    .map_err(|_| UrlAuthError::InvalidExpiryFormat)?;
                expiry = Some(parsed);
                continue;
            }

            extra_params.push((key.into_owned(), value.into_owned()));
        }

        let signature = signature.ok_or(UrlAuthError::MissingSignature)?;
        let expiry = expiry.ok_or(UrlAuthError::MissingExpiry)?;

        let param = |name: &str| {
            extra_params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        let resource = param(RESOURCE_PARAM)
            .filter(|r| !r.is_empty())
            .ok_or(UrlAuthError::MissingResource)?;
        let grantee = param(GRANTEE_PARAM);

        let extra_params_ref: Vec<(&str, &str)> = extra_params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        self.verify(path, &signature, expiry, &extra_params_ref)?;

        Ok(ResourceHandle {
            resource,
            grantee,
            expires_at: expiry,
        })
    }

    /// Compute the hex-encoded HMAC-SHA256 signature for a path and expiry.
    fn compute_signature(&self, path: &str, expiry: u64, params: &[(&str, &str)]) -> String {
        hex::encode(self.compute_mac(path, expiry, params))
    }

    fn compute_mac(&self, path: &str, expiry: u64, params: &[(&str, &str)]) -> Vec<u8> {
        let message = signature_base(path, expiry, params);

        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn signature_base(path: &str, expiry: u64, params: &[(&str, &str)]) -> String {
    let mut all_params: Vec<(String, String)> = Vec::with_capacity(params.len() + 1);
    for (key, value) in params {
        all_params.push(((*key).to_string(), (*value).to_string()));
    }
    all_params.push(("exp".to_string(), expiry.to_string()));

    format!("{}?{}", path, canonical_query(&all_params))
}

fn canonical_query(params: &[(String, String)]) -> String {
    let mut pairs = params.to_vec();
    pairs.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    // Encode each pair so a value containing '&' or '=' cannot alias
    // a different parameter set.
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

// =============================================================================
// Tests
// =============================================================================
