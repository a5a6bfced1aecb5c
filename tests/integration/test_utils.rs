//! Test utilities for integration tests.
//!
//! This module provides an in-memory media source and helpers for building a
//! router with a controllable clock.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tower::ServiceExt;

use media_gate::clock::MockClock;
use media_gate::error::IoError;
use media_gate::identity::{hash_password, Identity, MemoryIdentityStore};
use media_gate::io::RangeReader;
use media_gate::media::MediaSource;
use media_gate::{
    create_router, AppState, RouterConfig, SessionConfig, SignedUrlAuth, SignedUrlConfig,
    TokenIssuer,
};

pub const TEST_SECRET: &str = "test-secret-key-for-hmac-signing";
pub const BASE_URL: &str = "http://localhost:5050";

/// 2025-01-01T00:00:00Z
pub const NOW: u64 = 1_735_689_600;

pub const SESSION_LIFETIME: Duration = Duration::from_secs(7200);
pub const URL_TTL: Duration = Duration::from_secs(60);
pub const CHUNK_SIZE: usize = 1000;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse battery staple";
pub const VIDEO: &str = "videos/intro.mp4";
pub const VIDEO_SIZE: usize = 2500;

// =============================================================================
// In-Memory Media
// =============================================================================

/// A range reader over bytes held in memory.
pub struct MemoryReader {
    data: Bytes,
    identifier: String,
}

#[async_trait]
impl RangeReader for MemoryReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// A media source backed by a map of resource name to bytes.
#[derive(Default)]
pub struct MockMediaSource {
    media: HashMap<String, Bytes>,
}

impl MockMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media(mut self, resource: impl Into<String>, data: Vec<u8>) -> Self {
        self.media.insert(resource.into(), Bytes::from(data));
        self
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    type Reader = MemoryReader;

    async fn open(&self, resource: &str) -> Result<MemoryReader, IoError> {
        let data = self
            .media
            .get(resource)
            .cloned()
            .ok_or_else(|| IoError::NotFound(resource.to_string()))?;
        Ok(MemoryReader {
            data,
            identifier: format!("mem://{}", resource),
        })
    }
}

/// Argon2 hash of [`PASSWORD`], computed once per test binary.
pub fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).unwrap())
}

/// Deterministic test payload: byte `i` is `i % 251`.
pub fn video_bytes() -> Vec<u8> {
    (0..VIDEO_SIZE).map(|i| (i % 251) as u8).collect()
}

// =============================================================================
// Test Application
// =============================================================================

/// A router plus handles on the pieces tests need to poke at.
pub struct TestApp {
    pub router: Router,
    pub clock: MockClock,
    pub identities: Arc<MemoryIdentityStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::development().with_tracing(false))
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let clock = MockClock::new(NOW);

        let issuer = TokenIssuer::new(&SessionConfig::new(TEST_SECRET, SESSION_LIFETIME))
            .with_clock(Arc::new(clock.clone()));
        let url_config = SignedUrlConfig::new(TEST_SECRET, BASE_URL).with_ttl(URL_TTL);
        let signed_urls =
            SignedUrlAuth::from_config(&url_config).with_clock(Arc::new(clock.clone()));

        let mut dormant = Identity::new("u2", "dormant@example.com", password_hash());
        dormant.active = false;

        let mut ada = Identity::new("u1", EMAIL, password_hash());
        ada.name = Some("Ada".to_string());
        ada.role = "admin".to_string();
        ada.created_at = Some(NOW - 86_400);

        let identities = Arc::new(
            MemoryIdentityStore::new()
                .with_identity(ada)
                .with_identity(dormant),
        );

        let media = MockMediaSource::new().with_media(VIDEO, video_bytes());

        let state = AppState::new(issuer, signed_urls, identities.clone(), media)
            .with_stream_chunk_size(CHUNK_SIZE);

        Self {
            router: create_router(state, config),
            clock,
            identities,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Log in and return the raw credential from the `auth_token` cookie.
    pub async fn login(&self) -> String {
        let response = self.send(login_request(EMAIL, PASSWORD)).await;
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login sets a cookie")
            .to_str()
            .unwrap()
            .to_string();
        cookie_token(&cookie).to_string()
    }

    /// Log in and mint a signed URL for `resource`, returning path and query.
    pub async fn signed_path(&self, resource: &str) -> String {
        let token = self.login().await;
        let response = self.send(signed_url_request(&token, resource)).await;
        let json = body_json(response).await;
        let url = json["data"]["url"].as_str().unwrap();
        url.strip_prefix(BASE_URL).unwrap().to_string()
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

pub fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/user/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

pub fn signed_url_request(token: &str, resource: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/url/signed")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("auth_token={}", token))
        .body(Body::from(
            serde_json::json!({ "resource": resource }).to_string(),
        ))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_range(uri: &str, range: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}

/// Extract the credential from an `auth_token=...; Max-Age=...` header value.
pub fn cookie_token(set_cookie: &str) -> &str {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("auth_token="))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
