// ============================================================================
// Intake Config - Centralized configuration management
// ============================================================================
//
// Loaded once at startup from environment variables (and `.env` if present).
// Process-wide and read-only afterwards; services share it behind an `Arc`.
//
// ============================================================================

mod constants;
mod database;
mod kafka;
mod security;

pub use constants::{MAX_NAME_LENGTH, MAX_REQUEST_BODY_SIZE, MIN_NAME_LENGTH, PHONE_LENGTH};
pub use database::DbConfig;
pub use kafka::KafkaConfig;
pub use security::{RateLimitConfig, SpamConfig};

use anyhow::{Context, Result};
use constants::*;

/// Main configuration structure for the intake server
#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string (`POSTGRES_URL`)
    pub database_url: String,
    /// Redis connection string used by the rate limiter (`REDIS_URL`)
    pub redis_url: String,
    /// Shared secret for the admin listing and the log hashing salt
    pub secret_key: String,

    pub listen_addr: String,
    pub listen_port: u16,
    pub bind_address: String,

    /// Verbose logging and relaxed defaults for local runs
    pub debug: bool,
    pub rust_log: String,

    // Sub-configurations
    pub db: DbConfig,
    pub kafka: KafkaConfig,
    pub rate_limit: RateLimitConfig,
    pub spam: SpamConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("POSTGRES_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .context("POSTGRES_URL must be set")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL must be set")?;
        let kafka_url = std::env::var("KAFKA_URL").context("KAFKA_URL must be set")?;

        let secret_key = std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?;
        if secret_key.trim().is_empty() {
            anyhow::bail!("SECRET_KEY must not be empty");
        }

        let listen_addr =
            std::env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_port = match std::env::var("LISTEN_PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("LISTEN_PORT is not a valid port: {}", port))?,
            Err(_) => DEFAULT_LISTEN_PORT,
        };

        let debug = std::env::var("DEBUG")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_filter(debug));

        Ok(Self {
            database_url,
            redis_url,
            secret_key,
            bind_address: bind_address(&listen_addr, listen_port),
            listen_addr,
            listen_port,
            debug,
            rust_log,
            db: DbConfig::from_env(),
            kafka: KafkaConfig::from_env(kafka_url),
            rate_limit: RateLimitConfig::from_env(),
            spam: SpamConfig::from_env(),
        })
    }

    /// Configuration with every optional setting at its default.
    /// Kafka starts disabled so nothing is published by accident.
    pub fn with_defaults(database_url: &str, redis_url: &str, secret_key: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            redis_url: redis_url.to_string(),
            secret_key: secret_key.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            bind_address: bind_address(DEFAULT_LISTEN_ADDR, DEFAULT_LISTEN_PORT),
            debug: false,
            rust_log: default_log_filter(false),
            db: DbConfig::default(),
            kafka: KafkaConfig::disabled(),
            rate_limit: RateLimitConfig::default(),
            spam: SpamConfig::default(),
        }
    }
}

/// Accepts the spellings people actually put in `.env` files
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_log_filter(debug: bool) -> String {
    if debug {
        "debug".to_string()
    } else {
        "info".to_string()
    }
}

fn bind_address(addr: &str, port: u16) -> String {
    // IPv6 literals need brackets in a socket address
    if addr.contains(':') && !addr.starts_with('[') {
        format!("[{}]:{}", addr, port)
    } else {
        format!("{}:{}", addr, port)
    }
}
