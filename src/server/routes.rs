//! Router configuration for the session and media API.
//!
//! This module defines the HTTP routes and applies the session guard, CORS
//! and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                    - Health check (public)
//! /api/user/login            - Login, issues the session cookie (public)
//! /token                     - Read back the session cookie (public)
//! /logout                    - Clear the session cookie (public)
//! /url/signed                - Mint a signed media URL (session required)
//! /authenticated/videoUrl    - Redeem a signed URL (signature required)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use media_gate::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new(issuer, signed_urls, identities, media);
//! let router = create_router(state, RouterConfig::production());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5050").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    fallback_handler, health_handler, login_handler, logout_handler, signed_url_handler,
    token_handler, video_stream_handler, AppState,
};
use crate::auth::guard::{session_guard, SessionGuard};
use crate::auth::signed_url::VIDEO_URL_PATH;
use crate::media::MediaSource;

/// Origins allowed by default in development.
pub const DEV_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5050"];

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Production mode: permissive CORS. Development: origin allow-list.
    pub production: bool,

    /// Allowed CORS origins in development (None = the default localhost list)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Development configuration: localhost CORS allow-list, tracing on.
    pub fn development() -> Self {
        Self {
            production: false,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Production configuration: any origin, tracing on.
    pub fn production() -> Self {
        Self {
            production: true,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins for development mode.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (health, login, token, logout)
/// - The signed URL redemption route (self-authenticating)
/// - The session-guarded URL minting route
/// - A JSON 404 fallback
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router<M>(state: AppState<M>, config: RouterConfig) -> Router
where
    M: MediaSource + 'static,
{
    let guard = SessionGuard::new(state.issuer.clone(), state.identities.clone());

    // route_layer so unmatched paths fall through to the 404 instead of a 401
    let protected_routes = Router::new()
        .route("/url/signed", post(signed_url_handler::<M>))
        .route_layer(middleware::from_fn_with_state(guard, session_guard))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/user/login", post(login_handler::<M>))
        .route("/token", get(token_handler))
        .route("/logout", get(logout_handler))
        .route(VIDEO_URL_PATH, get(video_stream_handler::<M>))
        .with_state(state);

    let router = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .fallback(fallback_handler)
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    if config.production {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    }

    let origins: Vec<HeaderValue> = match &config.cors_origins {
        Some(origins) => origins.iter().filter_map(|o| o.parse().ok()).collect(),
        None => DEV_CORS_ORIGINS
            .iter()
            .map(|o| HeaderValue::from_static(*o))
            .collect(),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::PUT,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

// =============================================================================
// Tests
// =============================================================================
