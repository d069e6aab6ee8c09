//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub catalog_base_url: String,
    pub catalog_max_results: u32,
    /// Client-side bound on add and catalog search calls.
    pub request_timeout: Duration,
    pub session_ttl_days: i64,
    /// Loaded shelves untouched for this long are dropped from memory.
    pub shelf_idle_ttl: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Catalog Search Settings ---
        let catalog_base_url = std::env::var("CATALOG_BASE_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/books/v1".to_string());
        let catalog_max_results = parse_var::<u32>("CATALOG_MAX_RESULTS", "20")?;

        // --- Load Timeouts and Session Lifetime ---
        let timeout_secs = parse_var::<u64>("REQUEST_TIMEOUT_SECS", "10")?;
        let session_ttl_days = parse_var::<i64>("SESSION_TTL_DAYS", "30")?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be a positive number of days".to_string(),
            ));
        }

        let shelf_idle_secs = parse_var::<u64>("SHELF_IDLE_SECS", "1800")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            catalog_base_url,
            catalog_max_results,
            request_timeout: Duration::from_secs(timeout_secs),
            session_ttl_days,
            shelf_idle_ttl: Duration::from_secs(shelf_idle_secs),
        })
    }
}

/// Reads `name`, falling back to `default`, and parses it.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
