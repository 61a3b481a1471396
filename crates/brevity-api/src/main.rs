//! brevity HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brevity_api::services::{GoogleOAuth, GoogleOAuthConfig};
use brevity_api::{build_router, AppState, ServerConfig};
use brevity_db::{Database, IdentityProvider, PoolConfig};
use brevity_inference::OpenAIBackend;

/// How often expired sessions are deleted.
const SESSION_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "brevity_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "brevity_api=debug,brevity_db=info,brevity_inference=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("brevity-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;

    let db = Database::connect_with_config(&database_url, PoolConfig::from_env())
        .await?
        .with_session_ttl(config.session_ttl());
    db.migrate().await?;
    info!("Database migrations applied");

    let completion = Arc::new(OpenAIBackend::from_env()?);

    let mut state = AppState::from_database(db, completion);
    if let Some(oauth_config) = GoogleOAuthConfig::from_env(&config.site_url) {
        state = state.with_google_oauth(GoogleOAuth::new(oauth_config)?);
        info!("Google sign-in enabled");
    }

    tokio::spawn(sweep_expired_sessions(state.auth.identity()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = build_router(state.with_config(config));

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically delete sessions past their expiry.
async fn sweep_expired_sessions(identity: Arc<dyn IdentityProvider>) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        match identity.purge_expired_sessions().await {
            Ok(0) => {}
            Ok(removed) => info!(
                subsystem = "identity",
                component = "sessions",
                op = "purge",
                removed,
                "Purged expired sessions"
            ),
            Err(e) => warn!(
                subsystem = "identity",
                component = "sessions",
                error = %e,
                "Session purge failed"
            ),
        }
    }
}
