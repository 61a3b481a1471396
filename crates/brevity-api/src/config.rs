//! Server configuration read from the environment.

use axum::http::HeaderValue;

use brevity_core::{Error, Result};
use brevity_db::DEFAULT_SESSION_TTL_HOURS;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Process-level settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Only required by the binary; tests build routers without a database.
    pub database_url: Option<String>,
    pub allowed_origins: Vec<HeaderValue>,
    pub session_ttl_hours: i64,
    /// Public origin used to build OAuth redirect URLs.
    pub site_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: None,
            allowed_origins: parse_allowed_origins(None),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            site_url: DEFAULT_SITE_URL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `DATABASE_URL`, `ALLOWED_ORIGINS`,
    /// `SESSION_TTL_HOURS` and `SITE_URL`.
    ///
    /// Malformed numbers are configuration errors rather than silent defaults.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {raw}")))?,
            Err(_) => DEFAULT_PORT,
        };
        let session_ttl_hours = match std::env::var("SESSION_TTL_HOURS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(Error::Config(format!(
                        "SESSION_TTL_HOURS must be a positive integer: {raw}"
                    )))
                }
            },
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port,
            database_url: std::env::var("DATABASE_URL").ok(),
            allowed_origins: parse_allowed_origins(std::env::var("ALLOWED_ORIGINS").ok().as_deref()),
            session_ttl_hours,
            site_url: std::env::var("SITE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_SITE_URL.to_string()),
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

/// Parse a comma-separated CORS origin whitelist.
///
/// ```text
/// ALLOWED_ORIGINS=https://notes.example.com,http://localhost:3000
/// ```
///
/// Invalid entries are skipped with a warning. An unset or blank value falls
/// back to the local development origin.
pub fn parse_allowed_origins(raw: Option<&str>) -> Vec<HeaderValue> {
    let origins_str = raw.unwrap_or(DEFAULT_ALLOWED_ORIGINS);

    if origins_str.trim().is_empty() {
        return vec![HeaderValue::from_static(DEFAULT_ALLOWED_ORIGINS)];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}
