//! Configuration management for Media Gate.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with the `MEDIA_GATE_` prefix, plus the
//!   conventional `JWT_SECRET`, `JWT_EXPIRES_IN` and `NODE_ENV`
//! - Sensible defaults for all optional settings
//!
//! Everything here is read once at startup and turned into the immutable
//! [`SessionConfig`], [`SignedUrlConfig`] and [`RouterConfig`] values the
//! components are constructed with.
//!
//! # Environment Variables
//!
//! - `MEDIA_GATE_HOST` - Server bind address (default: 0.0.0.0)
//! - `MEDIA_GATE_PORT` - Server port (default: 5050)
//! - `NODE_ENV` - `development` or `production` (default: development)
//! - `JWT_SECRET` - HMAC secret for session credentials (required)
//! - `JWT_EXPIRES_IN` - Session lifetime, e.g. `2h` (default: 2h)
//! - `MEDIA_GATE_URL_SECRET` - HMAC secret for signed URLs (default: JWT secret)
//! - `MEDIA_GATE_SIGNED_URL_TTL` - Signed URL lifetime (default: 1h)
//! - `MEDIA_GATE_PUBLIC_URL` - Base URL prepended to minted URLs
//! - `MEDIA_GATE_MEDIA_DIR` - Serve media from this directory
//! - `MEDIA_GATE_S3_BUCKET` - Serve media from this S3 bucket
//! - `MEDIA_GATE_IDENTITIES` - JSON file of identity records

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::auth::session::SessionConfig;
use crate::auth::signed_url::SignedUrlConfig;
use crate::error::ConfigError;
use crate::media::DEFAULT_STREAM_CHUNK_SIZE;
use crate::server::RouterConfig;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5050;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default session lifetime.
pub const DEFAULT_JWT_EXPIRES_IN: &str = "2h";

/// Default signed URL lifetime.
pub const DEFAULT_URL_TTL: &str = "1h";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Media Gate - session cookies and signed URLs for protected video.
#[derive(Parser, Debug, Clone)]
#[command(name = "media-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Mint a signed media URL offline.
    Sign(SignConfig),

    /// Print the Argon2 PHC string for a password, for the identities file.
    HashPassword(HashPasswordConfig),
}

/// Deployment environment.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Settings for the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MEDIA_GATE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MEDIA_GATE_PORT")]
    pub port: u16,

    /// Deployment environment; production sets Secure cookies and open CORS.
    #[arg(long, value_enum, default_value_t = Environment::Development, env = "NODE_ENV")]
    pub environment: Environment,

    // =========================================================================
    // Session Configuration
    // =========================================================================
    /// Secret key for signing session credentials.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Session lifetime (e.g. "2h", "30m", "7d").
    #[arg(long, default_value = DEFAULT_JWT_EXPIRES_IN, env = "JWT_EXPIRES_IN")]
    pub jwt_expires_in: String,

    // =========================================================================
    // Signed URL Configuration
    // =========================================================================
    /// Secret key for signed media URLs. Falls back to the JWT secret.
    #[arg(long, env = "MEDIA_GATE_URL_SECRET", hide_env_values = true)]
    pub url_secret: Option<String>,

    /// Signed URL lifetime (e.g. "60s", "1h").
    #[arg(long, default_value = DEFAULT_URL_TTL, env = "MEDIA_GATE_SIGNED_URL_TTL")]
    pub signed_url_ttl: String,

    /// Base URL prepended to minted URLs (default: http://{host}:{port}).
    #[arg(long, env = "MEDIA_GATE_PUBLIC_URL")]
    pub public_url: Option<String>,

    // =========================================================================
    // Media Storage Configuration
    // =========================================================================
    /// Directory containing protected media.
    #[arg(long, env = "MEDIA_GATE_MEDIA_DIR", conflicts_with = "s3_bucket")]
    pub media_dir: Option<PathBuf>,

    /// S3 bucket containing protected media.
    #[arg(long, env = "MEDIA_GATE_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix for media objects within the bucket.
    #[arg(long, env = "MEDIA_GATE_S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "MEDIA_GATE_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "MEDIA_GATE_S3_REGION")]
    pub s3_region: String,

    /// Maximum bytes per ranged response.
    #[arg(long, default_value_t = DEFAULT_STREAM_CHUNK_SIZE, env = "MEDIA_GATE_CHUNK_SIZE")]
    pub chunk_size: usize,

    // =========================================================================
    // Identity Configuration
    // =========================================================================
    /// JSON file with identity records to authenticate against.
    #[arg(long, env = "MEDIA_GATE_IDENTITIES")]
    pub identities_file: Option<PathBuf>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins in development (comma-separated).
    #[arg(long, env = "MEDIA_GATE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.jwt_secret.as_deref() {
            None | Some("") => {
                return Err(ConfigError::Invalid(
                    "No session secret provided. Set --jwt-secret or JWT_SECRET".to_string(),
                ))
            }
            Some(_) => {}
        }

        if self.url_secret.as_deref() == Some("") {
            return Err(ConfigError::Invalid(
                "Signed URL secret must not be empty".to_string(),
            ));
        }

        positive_duration(&self.jwt_expires_in)?;
        positive_duration(&self.signed_url_ttl)?;

        match (&self.media_dir, &self.s3_bucket) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "No media storage configured. Set --media-dir or --s3-bucket".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "Set only one of --media-dir and --s3-bucket".to_string(),
                ))
            }
            (None, Some(bucket)) if bucket.is_empty() => {
                return Err(ConfigError::Invalid(
                    "S3 bucket name must not be empty".to_string(),
                ))
            }
            _ => {}
        }

        if self.chunk_size < 1024 || self.chunk_size > 16 * 1024 * 1024 {
            return Err(ConfigError::Invalid(
                "chunk_size must be between 1KB and 16MB".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Base URL for minted signed URLs.
    pub fn public_base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_address()),
        }
    }

    /// Build the session issuer settings (call `validate()` first).
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let lifetime = positive_duration(&self.jwt_expires_in)?;
        Ok(
            SessionConfig::new(self.jwt_secret.clone().unwrap_or_default(), lifetime)
                .with_secure_cookie(self.is_production()),
        )
    }

    /// Build the signed URL settings (call `validate()` first).
    pub fn signed_url_config(&self) -> Result<SignedUrlConfig, ConfigError> {
        let ttl = positive_duration(&self.signed_url_ttl)?;
        let secret = self
            .url_secret
            .clone()
            .or_else(|| self.jwt_secret.clone())
            .unwrap_or_default();
        Ok(SignedUrlConfig::new(secret, self.public_base_url()).with_ttl(ttl))
    }

    /// Build the router settings.
    pub fn router_config(&self) -> RouterConfig {
        let mut config = if self.is_production() {
            RouterConfig::production()
        } else {
            RouterConfig::development()
        };

        if let Some(ref origins) = self.cors_origins {
            config = config.with_cors_origins(origins.clone());
        }

        config.with_tracing(!self.no_tracing)
    }
}

// =============================================================================
// Sign Command
// =============================================================================

/// Output format for the `sign` subcommand.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutputFormat {
    #[default]
    Url,
    Json,
    Signature,
}

/// Settings for the `sign` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Secret key for signed media URLs.
    #[arg(long, env = "MEDIA_GATE_URL_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Resource to grant access to (e.g. "videos/intro.mp4").
    #[arg(long)]
    pub resource: String,

    /// Identity id to bind the URL to.
    #[arg(long)]
    pub uid: Option<String>,

    /// Lifetime of the URL (e.g. "60s", "1h").
    #[arg(long, default_value = DEFAULT_URL_TTL)]
    pub ttl: String,

    /// Base URL of the server.
    #[arg(long, default_value = "http://localhost:5050", env = "MEDIA_GATE_PUBLIC_URL")]
    pub base_url: String,

    /// What to print.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Url)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("Secret must not be empty".to_string()));
        }
        if self.resource.trim().is_empty() {
            return Err(ConfigError::Invalid("Resource must not be empty".to_string()));
        }
        positive_duration(&self.ttl)?;
        Ok(())
    }

    pub fn ttl(&self) -> Result<Duration, ConfigError> {
        positive_duration(&self.ttl)
    }
}

// =============================================================================
// Hash Password Command
// =============================================================================

/// Settings for the `hash-password` subcommand.
#[derive(Args, Debug, Clone)]
pub struct HashPasswordConfig {
    /// Password to hash.
    #[arg(long, env = "MEDIA_GATE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl HashPasswordConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.password.is_empty() {
            return Err(ConfigError::Invalid("Password must not be empty".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Duration Parsing
// =============================================================================

/// Parse a duration string such as "2h", "90m", "30s", "500ms", "7d" or "1w".
///
/// A bare number is taken as seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(invalid("expected a number"));
    }
    let amount: u64 = digits.parse().map_err(|_| invalid("number too large"))?;

    let millis_per_unit: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => 1,
        "" | "s" | "sec" | "secs" => 1_000,
        "m" | "min" | "mins" => 60_000,
        "h" | "hr" | "hrs" => 3_600_000,
        "d" | "day" | "days" => 86_400_000,
        "w" | "week" | "weeks" => 604_800_000,
        _ => return Err(invalid("unknown unit (use ms, s, m, h, d or w)")),
    };

    amount
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| invalid("duration too large"))
}

/// Parse a duration that must be at least one second.
fn positive_duration(value: &str) -> Result<Duration, ConfigError> {
    let duration = parse_duration(value)?;
    if duration.as_secs() == 0 {
        return Err(ConfigError::InvalidDuration {
            value: value.to_string(),
            reason: "must be at least 1s".to_string(),
        });
    }
    Ok(duration)
}

// =============================================================================
// Tests
// =============================================================================
