//! Session credentials and signed media URLs.
//!
//! # Flow
//!
//! ```text
//!  login ──► TokenIssuer ──► auth_token cookie
//!                                 │
//!  POST /url/signed ──► session_guard ──► SignedUrlAuth::mint ──► signed URL
//!                                                                    │
//!  GET /authenticated/videoUrl ──► SignedUrlAuth::verify_request ──► stream
//! ```

pub mod guard;
pub mod session;
pub mod signed_url;

pub use guard::{session_guard, SessionGuard};
pub use session::{
    clear_session_cookie, cookie_value, credential_from_headers, SessionClaims, SessionConfig,
    TokenIssuer, AUTH_COOKIE, DEFAULT_TOKEN_LIFETIME,
};
pub use signed_url::{
    ResourceHandle, SignedUrl, SignedUrlAuth, SignedUrlConfig, DEFAULT_SIGNED_URL_TTL,
    VIDEO_URL_PATH,
};
