use thiserror::Error;

/// I/O errors that can occur when reading media from storage
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Error from the local filesystem
    #[error("Filesystem error: {0}")]
    Fs(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Client asked for a byte range the resource cannot satisfy
    #[error("Range not satisfiable for resource of {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    /// Resource reference escapes the media root or is otherwise malformed
    #[error("Invalid resource path: {0}")]
    InvalidPath(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Resource not found: {0}")]
    NotFound(String),
}

/// Errors raised while issuing or checking session credentials.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The credential could not be signed (maps to HTTP 500)
    #[error("Error occurred while generating session token: {0}")]
    SigningFailure(String),

    /// No `auth_token` cookie on a request that reads it back
    #[error("You can not access this page, you have to login or signup")]
    MissingCredential,

    /// No credential on a request to a protected route
    #[error("You are not logged in, please login to get access")]
    NotLoggedIn,

    /// Credential is malformed or its signature does not verify
    #[error("Invalid session token")]
    InvalidToken,

    /// Credential expired at `expired_at` (Unix seconds)
    #[error("Session token expired at {expired_at} (current time: {current_time})")]
    TokenExpired { expired_at: u64, current_time: u64 },

    /// Credential refers to an identity that no longer exists
    #[error("The user belonging to this token no longer exists")]
    UnknownIdentity,

    /// Identity exists but has been deactivated
    #[error("This account has been deactivated")]
    InactiveIdentity,

    /// Password changed after the credential was issued
    #[error("Password was changed recently, please login again")]
    PasswordChanged,

    /// Login attempt with wrong email or password
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Identity store could not be reached
    #[error("Identity store error: {0}")]
    Store(String),

    /// A password could not be hashed
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Errors raised while verifying a signed media URL.
#[derive(Debug, Clone, Error)]
pub enum UrlAuthError {
    /// `sig` query parameter is missing
    #[error("Missing signature parameter")]
    MissingSignature,

    /// `exp` query parameter is missing
    #[error("Missing expiry parameter")]
    MissingExpiry,

    /// `resource` query parameter is missing
    #[error("Missing resource parameter")]
    MissingResource,

    /// Signature has expired
    #[error("Signature expired at {expired_at} (current time: {current_time})")]
    Expired { expired_at: u64, current_time: u64 },

    /// Signature does not match the URL
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature is not valid hex, or given more than once
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Expiry is not a valid integer, or given more than once
    #[error("Invalid expiry format")]
    InvalidExpiryFormat,
}

/// Startup configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to load identities from {path}: {reason}")]
    Identities { path: String, reason: String },
}
