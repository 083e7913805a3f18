use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub token_expiry_hours: i64,
}

impl Config {
    /// Full configuration for the HTTP server.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
        })
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("SERVER_PORT must be a port number")?,
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            max_upload_bytes: upload_limit_bytes(
                &std::env::var("MAX_UPLOAD_MB").unwrap_or_else(|_| "512".to_string()),
            )?,
        })
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set to a Postgres instance")?,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
        })
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set to sign session tokens")?,
            token_expiry_hours: token_expiry_hours(
                &std::env::var("TOKEN_EXPIRY_HOURS").unwrap_or_else(|_| "24".to_string()),
            )?,
        })
    }
}

pub fn tiers_file_from_env() -> Option<PathBuf> {
    std::env::var_os("TIERS_FILE").map(PathBuf::from)
}

/// Megabytes to bytes, refusing limits that do not fit in memory addresses.
fn upload_limit_bytes(raw: &str) -> Result<usize> {
    let megabytes: usize = raw.trim().parse().context("MAX_UPLOAD_MB must be a number")?;
    megabytes
        .checked_mul(1024 * 1024)
        .with_context(|| format!("MAX_UPLOAD_MB {megabytes} is too large"))
}

/// Session lifetime in hours; it must be positive and land on a
/// representable date.
fn token_expiry_hours(raw: &str) -> Result<i64> {
    let hours: i64 = raw.trim().parse().context("TOKEN_EXPIRY_HOURS must be a number")?;
    if hours <= 0 {
        bail!("TOKEN_EXPIRY_HOURS must be positive, got {hours}");
    }
    Duration::try_hours(hours)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .with_context(|| format!("TOKEN_EXPIRY_HOURS {hours} is too large"))?;
    Ok(hours)
}
