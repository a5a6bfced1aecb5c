//! HTTP request handlers for the session and media API.
//!
//! # Endpoints
//!
//! - `POST /api/user/login` - Authenticate and issue the session cookie
//! - `GET /token` - Read back the session credential from the cookie
//! - `POST /url/signed` - Mint a signed media URL (session required)
//! - `GET /authenticated/videoUrl` - Redeem a signed URL and stream the video
//! - `GET /logout` - Clear the session cookie
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, OriginalUri, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::session::{clear_session_cookie, cookie_value, TokenIssuer, AUTH_COOKIE};
use crate::auth::signed_url::{SignedUrl, SignedUrlAuth};
use crate::error::{IoError, SessionError, UrlAuthError};
use crate::identity::{Identity, IdentityStore};
use crate::io::RangeReader;
use crate::media::{content_type_for, ByteRange, MediaSource, DEFAULT_STREAM_CHUNK_SIZE};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor. Everything in
/// it is immutable after startup apart from whatever the identity store
/// does internally.
pub struct AppState<M: MediaSource> {
    /// Session credential issuer
    pub issuer: TokenIssuer,

    /// Signed media URL authorizer
    pub signed_urls: SignedUrlAuth,

    /// Identity lookup for login and the session guard
    pub identities: Arc<dyn IdentityStore>,

    /// Where protected media lives
    pub media: Arc<M>,

    /// Maximum bytes per ranged response and per streamed chunk
    pub stream_chunk_size: usize,
}

impl<M: MediaSource> AppState<M> {
    pub fn new(
        issuer: TokenIssuer,
        signed_urls: SignedUrlAuth,
        identities: Arc<dyn IdentityStore>,
        media: M,
    ) -> Self {
        Self {
            issuer,
            signed_urls,
            identities,
            media: Arc::new(media),
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
        }
    }

    pub fn with_stream_chunk_size(mut self, chunk_size: usize) -> Self {
        self.stream_chunk_size = chunk_size.max(1);
        self
    }
}

impl<M: MediaSource> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            issuer: self.issuer.clone(),
            signed_urls: self.signed_urls.clone(),
            identities: Arc::clone(&self.identities),
            media: Arc::clone(&self.media),
            stream_chunk_size: self.stream_chunk_size,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Body of `POST /api/user/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /url/signed`.
#[derive(Debug, Deserialize)]
pub struct SignedUrlRequest {
    /// Resource to grant access to (e.g. "videos/intro.mp4")
    #[serde(alias = "videoId")]
    pub resource: String,
}

/// JSON body extractor whose rejections use the JSON error body.
///
/// Wraps [`Json`]; a missing content type, unparsable JSON or a body of the
/// wrong shape becomes a [`BodyRejection`] instead of axum's plain-text reply.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = BodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// A request body that could not be read as the expected JSON.
#[derive(Debug)]
pub struct BodyRejection {
    status: StatusCode,
    message: String,
}

impl From<JsonRejection> for BodyRejection {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        error_response(self.status, "invalid_body", self.message)
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// "fail" for client errors, "error" for server errors
    pub status: String,

    /// Error type identifier (e.g., "not_found", "invalid_signature")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response for the given status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        let kind = if status.is_server_error() {
            "error"
        } else {
            "fail"
        };
        Self {
            status: kind.to_string(),
            error: error.into(),
            message: message.into(),
        }
    }
}

/// `{ "status": "success", "data": ... }` envelope.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

/// `{ "status": "success", "message": ... }` envelope.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

/// Payload of `GET /token`.
#[derive(Debug, Serialize)]
pub struct TokenData {
    pub token: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log an error and build its JSON response.
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    log_error(status, error_type, &message);
    error_body(status, error_type, message)
}

/// Log an error by severity.
///
/// - 5xx errors are logged at ERROR level
/// - 403 (forged signatures) at WARN level
/// - other 4xx errors at DEBUG level; they are routine
fn log_error(status: StatusCode, error_type: &str, message: &str) {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::FORBIDDEN {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    } else {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }
}

/// Log a server-side failure with its detail; the client only gets a generic message.
fn internal_error(error_type: &str, detail: String) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    log_error(status, error_type, &detail);
    error_body(status, error_type, "Internal Server Error".to_string())
}

fn error_body(status: StatusCode, error_type: &str, message: String) -> Response {
    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            SessionError::SigningFailure(_) => {
                return internal_error("signing_failure", self.to_string());
            }
            SessionError::PasswordHash(_) => {
                return internal_error("hash_failure", self.to_string());
            }
            SessionError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            SessionError::MissingCredential => (StatusCode::BAD_REQUEST, "missing_credential"),
            SessionError::NotLoggedIn => (StatusCode::UNAUTHORIZED, "not_logged_in"),
            SessionError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            SessionError::TokenExpired { .. } => (StatusCode::UNAUTHORIZED, "token_expired"),
            SessionError::UnknownIdentity => (StatusCode::UNAUTHORIZED, "unknown_identity"),
            SessionError::InactiveIdentity => (StatusCode::UNAUTHORIZED, "inactive_identity"),
            SessionError::PasswordChanged => (StatusCode::UNAUTHORIZED, "password_changed"),
            SessionError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials")
            }
        };

        error_response(status, error_type, self.to_string())
    }
}

impl IntoResponse for UrlAuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            UrlAuthError::MissingSignature => (StatusCode::BAD_REQUEST, "missing_signature"),
            UrlAuthError::MissingExpiry => (StatusCode::BAD_REQUEST, "missing_expiry"),
            UrlAuthError::MissingResource => (StatusCode::BAD_REQUEST, "missing_resource"),
            UrlAuthError::InvalidSignatureFormat => {
                (StatusCode::BAD_REQUEST, "invalid_signature_format")
            }
            UrlAuthError::InvalidExpiryFormat => (StatusCode::BAD_REQUEST, "invalid_expiry_format"),
            UrlAuthError::InvalidSignature => (StatusCode::FORBIDDEN, "invalid_signature"),
            UrlAuthError::Expired { .. } => (StatusCode::UNAUTHORIZED, "signature_expired"),
        };

        error_response(status, error_type, self.to_string())
    }
}

impl IntoResponse for IoError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            IoError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            IoError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "invalid_resource"),
            IoError::RangeNotSatisfiable { size } => {
                let mut response = error_response(
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    "range_not_satisfiable",
                    self.to_string(),
                );
                if let Ok(value) = header::HeaderValue::from_str(&format!("bytes */{}", size)) {
                    response.headers_mut().insert(header::CONTENT_RANGE, value);
                }
                return response;
            }
            IoError::Connection(_) => (StatusCode::BAD_GATEWAY, "connection_error"),
            IoError::S3(_) | IoError::Fs(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            IoError::RangeOutOfBounds { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

/// Errors from the stream endpoint: either the URL or the storage failed.
#[derive(Debug)]
pub enum StreamError {
    Auth(UrlAuthError),
    Io(IoError),
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        match self {
            StreamError::Auth(err) => err.into_response(),
            StreamError::Io(err) => err.into_response(),
        }
    }
}

impl From<UrlAuthError> for StreamError {
    fn from(err: UrlAuthError) -> Self {
        StreamError::Auth(err)
    }
}

impl From<IoError> for StreamError {
    fn from(err: IoError) -> Self {
        StreamError::Io(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle login requests.
///
/// # Endpoint
///
/// `POST /api/user/login` with `{ "email": ..., "password": ... }`
///
/// # Response
///
/// - `200 OK`: `auth_token` cookie set, body `{ status, data: { user } }`
///   with the sanitized identity
/// - `400 Bad Request`: body is not a JSON login object
/// - `401 Unauthorized`: wrong credentials or deactivated account
/// - `415 Unsupported Media Type`: body is not declared as JSON
/// - `500 Internal Server Error`: credential signing failed (no cookie set)
pub async fn login_handler<M: MediaSource>(
    State(state): State<AppState<M>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, SessionError> {
    let identity = state
        .identities
        .authenticate(&body.email, &body.password)
        .await?
        .ok_or(SessionError::InvalidCredentials)?;

    if !identity.active {
        return Err(SessionError::InactiveIdentity);
    }

    Ok(state.issuer.issue(&identity, StatusCode::OK))
}

/// Return the session credential stored in the `auth_token` cookie.
///
/// # Endpoint
///
/// `GET /token`
///
/// # Response
///
/// - `200 OK`: `{ status: "success", data: { token } }`
/// - `400 Bad Request`: no cookie present
pub async fn token_handler(
    headers: HeaderMap,
) -> Result<Json<SuccessResponse<TokenData>>, SessionError> {
    let token = cookie_value(&headers, AUTH_COOKIE).ok_or(SessionError::MissingCredential)?;
    Ok(Json(SuccessResponse::new(TokenData { token })))
}

/// Mint a signed URL for the logged-in identity.
///
/// # Endpoint
///
/// `POST /url/signed` with `{ "resource": "videos/intro.mp4" }`
///
/// Requires the session guard; the resolved identity becomes the URL's grantee.
///
/// # Response
///
/// - `200 OK`: `{ status, data: { url, resource, expiresAt } }`
/// - `400 Bad Request`: empty resource or malformed body
/// - `401 Unauthorized`: no valid session (from the guard)
/// - `415 Unsupported Media Type`: body is not declared as JSON
pub async fn signed_url_handler<M: MediaSource>(
    State(state): State<AppState<M>>,
    Extension(identity): Extension<Identity>,
    JsonBody(body): JsonBody<SignedUrlRequest>,
) -> Result<Json<SuccessResponse<SignedUrl>>, UrlAuthError> {
    let signed = state.signed_urls.mint(&body.resource, &identity)?;
    Ok(Json(SuccessResponse::new(signed)))
}

/// Redeem a signed URL and stream the resource.
///
/// # Endpoint
///
/// `GET /authenticated/videoUrl?resource=..&uid=..&exp=..&sig=..`
///
/// # Response
///
/// - `206 Partial Content`: for a `Range` request, at most one chunk
/// - `200 OK`: the whole resource, streamed chunk by chunk
/// - `400 Bad Request`: malformed signed URL
/// - `401 Unauthorized`: expired URL
/// - `403 Forbidden`: signature mismatch
/// - `404 Not Found`: resource does not exist
/// - `416 Range Not Satisfiable`: range starts past the end
pub async fn video_stream_handler<M: MediaSource>(
    State(state): State<AppState<M>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, StreamError> {
    let handle = state
        .signed_urls
        .verify_request(uri.path(), uri.query().unwrap_or(""))?;

    let reader = state.media.open(&handle.resource).await?;
    let size = reader.size();
    let content_type = reader
        .content_type()
        .unwrap_or_else(|| content_type_for(&handle.resource))
        .to_string();

    let range = match headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(value) => ByteRange::parse(value, size)?,
        None => None,
    };

    if let Some(range) = range {
        let range = range.capped(state.stream_chunk_size);
        let data = reader.read_exact_at(range.start, range.len() as usize).await?;

        debug!(
            resource = %handle.resource,
            grantee = ?handle.grantee,
            start = range.start,
            end = range.end,
            size = size,
            "Streaming range"
        );

        let response = (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_LENGTH, range.len().to_string()),
                (header::CONTENT_RANGE, range.content_range(size)),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (header::CACHE_CONTROL, "private, no-store".to_string()),
            ],
            Body::from(data),
        );
        return Ok(response.into_response());
    }

    debug!(
        resource = %handle.resource,
        grantee = ?handle.grantee,
        size = size,
        "Streaming full resource"
    );

    let body = Body::from_stream(chunked(Arc::new(reader), state.stream_chunk_size));
    let response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, size.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        body,
    );
    Ok(response.into_response())
}

/// Stream a whole resource as consecutive reads of at most `chunk_size` bytes.
fn chunked<R: RangeReader + 'static>(
    reader: Arc<R>,
    chunk_size: usize,
) -> impl futures_util::Stream<Item = Result<bytes::Bytes, IoError>> + Send + 'static {
    let size = reader.size();
    let chunk = chunk_size.max(1) as u64;

    futures_util::stream::try_unfold(0u64, move |offset| {
        let reader = Arc::clone(&reader);
        async move {
            if offset >= size {
                return Ok::<_, IoError>(None);
            }
            let len = chunk.min(size - offset) as usize;
            let data = reader.read_exact_at(offset, len).await?;
            Ok(Some((data, offset + len as u64)))
        }
    })
}

/// Clear the session cookie.
///
/// # Endpoint
///
/// `GET /logout`
pub async fn logout_handler() -> Response {
    let body = MessageResponse {
        status: "success".to_string(),
        message: "Logged out successfully...".to_string(),
    };
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(body),
    )
        .into_response()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Reply to any unmatched route.
pub async fn fallback_handler(OriginalUri(uri): OriginalUri) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("Can't find this page or route {}", uri),
    )
}

// =============================================================================
// Tests
// =============================================================================
