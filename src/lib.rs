//! # Media Gate
//!
//! Session cookies and short-lived signed URLs for streaming protected video.
//!
//! A client logs in and receives an `auth_token` cookie carrying a signed
//! session credential. With that cookie it asks for a signed URL to a piece
//! of media; the URL itself (path, resource, grantee, expiry and HMAC
//! signature) is then enough to stream the bytes, so players that cannot
//! attach cookies or headers can still fetch it.
//!
//! ## Features
//!
//! - **Session issuance**: HS256 session credentials delivered as an HttpOnly cookie
//! - **Session guard**: Axum middleware that resolves the cookie (or a bearer token) to an identity
//! - **Signed URLs**: HMAC-SHA256 over path, query and expiry, verified in constant time
//! - **Range streaming**: 206 partial responses from the local filesystem or S3
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`auth`] - Session issuer, session guard and signed URL authorizer
//! - [`identity`] - Identity records and the store they are looked up in
//! - [`media`] - Media sources and byte range handling
//! - [`io`] - Range readers over the filesystem and S3
//! - [`server`] - Axum-based HTTP handlers and routes
//! - [`config`] - CLI and configuration types
//! - [`clock`] - Injectable time source
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use media_gate::{
//!     create_router, AppState, FsMediaSource, MemoryIdentityStore, RouterConfig, SessionConfig,
//!     SignedUrlAuth, SignedUrlConfig, TokenIssuer,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let issuer = TokenIssuer::new(&SessionConfig::new("secret", Duration::from_secs(7200)));
//!     let signed_urls =
//!         SignedUrlAuth::from_config(&SignedUrlConfig::new("secret", "http://localhost:5050"));
//!     let identities = Arc::new(MemoryIdentityStore::new());
//!
//!     let state = AppState::new(issuer, signed_urls, identities, FsMediaSource::new("./media"));
//!     let router = create_router(state, RouterConfig::development());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5050").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod io;
pub mod media;
pub mod server;

// Re-export commonly used types
pub use auth::{
    clear_session_cookie, credential_from_headers, session_guard, ResourceHandle, SessionClaims,
    SessionConfig, SessionGuard, SignedUrl, SignedUrlAuth, SignedUrlConfig, TokenIssuer,
    AUTH_COOKIE, VIDEO_URL_PATH,
};
pub use clock::{system_clock, Clock, MockClock, SharedClock, SystemClock};
pub use config::{
    parse_duration, Cli, Command, HashPasswordConfig, ServeConfig, SignConfig, SignOutputFormat,
};
pub use error::{ConfigError, IoError, SessionError, UrlAuthError};
pub use identity::{
    hash_password, verify_password, Identity, IdentityStore, MemoryIdentityStore, PublicIdentity,
};
pub use io::{create_s3_client, FsRangeReader, RangeReader, S3RangeReader};
pub use media::{ByteRange, FsMediaSource, MediaSource, S3MediaSource};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
