//! Media Gate - session cookies and signed URLs for protected video.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_gate::{
    auth::signed_url::{GRANTEE_PARAM, RESOURCE_PARAM},
    config::{Cli, Command, HashPasswordConfig, ServeConfig, SignConfig, SignOutputFormat},
    create_router, create_s3_client, hash_password, AppState, FsMediaSource, IdentityStore,
    MediaSource, MemoryIdentityStore, S3MediaSource, SignedUrlAuth, TokenIssuer, VIDEO_URL_PATH,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
        Command::HashPassword(config) => run_hash_password(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let (session_config, url_config) = match (config.session_config(), config.signed_url_config())
    {
        (Ok(session), Ok(urls)) => (session, urls),
        (Err(e), _) | (_, Err(e)) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!(
        "  Environment: {}",
        if config.is_production() {
            "production"
        } else {
            "development"
        }
    );
    info!("  Session lifetime: {}s", session_config.lifetime.as_secs());
    info!("  Signed URL lifetime: {}s", url_config.ttl.as_secs());
    info!("  Signed URL base: {}", url_config.public_base_url);
    if config.url_secret.is_none() {
        warn!("  Signed URLs share the session secret; set --url-secret to separate them");
    }

    let identities = match config.identities_file {
        Some(ref path) => match MemoryIdentityStore::from_json_file(path) {
            Ok(store) => {
                info!("  Identities: {} loaded from {}", store.len().await, path.display());
                store
            }
            Err(e) => {
                error!("Failed to load identities: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("  Identities: none configured, every login will be rejected");
            MemoryIdentityStore::new()
        }
    };
    let identities: Arc<dyn IdentityStore> = Arc::new(identities);

    let issuer = TokenIssuer::new(&session_config);
    let signed_urls = SignedUrlAuth::from_config(&url_config);

    if let Some(ref dir) = config.media_dir {
        info!("  Media directory: {}", dir.display());
        let source = FsMediaSource::new(dir.clone());
        return serve_with(&config, AppState::new(issuer, signed_urls, identities, source)).await;
    }

    // validate() guarantees one of the two storage options is set
    let bucket = config.s3_bucket.clone().unwrap_or_default();
    info!("  S3 bucket: {}", bucket);
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);

    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let mut source = S3MediaSource::new(s3_client, bucket);
    if let Some(ref prefix) = config.s3_prefix {
        source = source.with_prefix(prefix.clone());
    }

    serve_with(&config, AppState::new(issuer, signed_urls, identities, source)).await
}

/// Build the router around `state` and serve until shutdown.
async fn serve_with<M>(config: &ServeConfig, state: AppState<M>) -> ExitCode
where
    M: MediaSource + 'static,
{
    let state = state.with_stream_chunk_size(config.chunk_size);
    let router = create_router(state, config.router_config());

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -c jar --json '{{\"email\":..,\"password\":..}}' http://{}/api/user/login",
        addr
    );
    info!(
        "    curl -b jar --json '{{\"resource\":\"..\"}}' http://{}/url/signed",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "media_gate=debug,tower_http=debug"
    } else {
        "media_gate=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let ttl = match config.ttl() {
        Ok(ttl) => ttl,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let auth = SignedUrlAuth::new(&config.secret);
    let resource = config.resource.trim();

    let mut params = vec![(RESOURCE_PARAM, resource)];
    if let Some(ref uid) = config.uid {
        params.push((GRANTEE_PARAM, uid.as_str()));
    }

    match config.format {
        SignOutputFormat::Signature => {
            let (signature, _) = auth.sign_with_params(VIDEO_URL_PATH, ttl, &params);
            println!("{}", signature);
        }
        SignOutputFormat::Json => {
            let (signature, expiry) = auth.sign_with_params(VIDEO_URL_PATH, ttl, &params);
            let url =
                auth.signed_url_with_expiry(&config.base_url, VIDEO_URL_PATH, expiry, &params);

            let json = serde_json::json!({
                "url": url,
                "resource": resource,
                "uid": config.uid,
                "signature": signature,
                "expiresAt": expiry,
                "ttl": ttl.as_secs(),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        SignOutputFormat::Url => {
            let url = auth.generate_signed_url(&config.base_url, VIDEO_URL_PATH, ttl, &params);
            println!("{}", url);
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Hash Password Command
// =============================================================================

fn run_hash_password(config: HashPasswordConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match hash_password(&config.password) {
        Ok(hash) => {
            println!("{}", hash);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
