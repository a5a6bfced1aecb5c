//! Session guard for routes that require a logged-in identity.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::post, Router};
//! use media_gate::auth::guard::{session_guard, SessionGuard};
//!
//! let guard = SessionGuard::new(issuer, store);
//! let app = Router::new()
//!     .route("/url/signed", post(signed_url_handler))
//!     .route_layer(middleware::from_fn_with_state(guard, session_guard));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::session::{credential_from_headers, TokenIssuer};
use crate::error::SessionError;
use crate::identity::{Identity, IdentityStore};

/// State for [`session_guard`].
#[derive(Clone)]
pub struct SessionGuard {
    issuer: TokenIssuer,
    store: Arc<dyn IdentityStore>,
}

impl SessionGuard {
    pub fn new(issuer: TokenIssuer, store: Arc<dyn IdentityStore>) -> Self {
        Self { issuer, store }
    }

    /// Resolve the identity behind a raw credential.
    pub async fn authorize(&self, token: &str) -> Result<Identity, SessionError> {
        let claims = self.issuer.verify(token)?;

        let identity = self
            .store
            .find_by_id(&claims.id)
            .await?
            .ok_or(SessionError::UnknownIdentity)?;

        if !identity.active {
            return Err(SessionError::InactiveIdentity);
        }

        if identity.changed_password_after(claims.iat) {
            return Err(SessionError::PasswordChanged);
        }

        Ok(identity)
    }
}

/// Axum middleware requiring a valid session credential.
///
/// The credential comes from the `auth_token` cookie or a bearer token. On
/// success the resolved [`Identity`] is inserted into request extensions.
pub async fn session_guard(
    State(guard): State<SessionGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, SessionError> {
    let token = credential_from_headers(request.headers()).ok_or(SessionError::NotLoggedIn)?;
    let identity = guard.authorize(&token).await?;

    debug!(identity = %identity.id, "Session verified");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
