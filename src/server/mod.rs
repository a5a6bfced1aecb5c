//! HTTP server layer.
//!
//! This module provides the HTTP API around the session issuer and the
//! signed URL authorizer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   POST /url/signed            GET /authenticated/videoUrl       │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────────┐  ┌─────────────────────┐  │
//! │  │  handlers   │  │  session_guard  │  │       routes        │  │
//! │  │ (requests)  │  │ (auth/guard.rs) │  │  (router config)    │  │
//! │  └─────────────┘  └─────────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    fallback_handler, health_handler, login_handler, logout_handler, signed_url_handler,
    token_handler, video_stream_handler, AppState, BodyRejection, ErrorResponse, HealthResponse,
    JsonBody, LoginRequest, MessageResponse, SignedUrlRequest, StreamError, SuccessResponse,
    TokenData,
};
pub use routes::{create_router, RouterConfig, DEV_CORS_ORIGINS};
