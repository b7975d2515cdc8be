//! Centralized configuration (environment variables + defaults).

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database URL must be provided (no default) for safety.
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
}

impl AppConfig {
    /// Reads the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let default_page_size: u32 = try_load(&lookup, "DEFAULT_PAGE_SIZE", "10")?;
        let max_page_size: u32 = try_load(&lookup, "MAX_PAGE_SIZE", "100")?;
        if default_page_size == 0 || max_page_size == 0 {
            return Err(ConfigError::Invalid {
                key: if default_page_size == 0 {
                    "DEFAULT_PAGE_SIZE"
                } else {
                    "MAX_PAGE_SIZE"
                },
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let public_base_url: String = try_load(&lookup, "PUBLIC_BASE_URL", "http://localhost:3000")?;

        Ok(Self {
            database_url,
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:3000")?,
            db_max_connections: try_load::<u32, _>(&lookup, "DB_MAX_CONNECTIONS", "5")?.max(1),
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
            upload_dir: PathBuf::from(try_load::<String, _>(&lookup, "UPLOAD_DIR", "./uploads")?),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

/// Break-glass credentials, read only by the preflight binary.
pub fn break_glass_credentials() -> Option<(String, String)> {
    break_glass_from_lookup(|key| std::env::var(key).ok())
}

pub fn break_glass_from_lookup<F>(lookup: F) -> Option<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    let username = lookup("BREAK_GLASS_USERNAME").filter(|v| !v.trim().is_empty())?;
    let password = lookup("BREAK_GLASS_PASSWORD").filter(|v| !v.is_empty())?;
    Some((username.trim().to_string(), password))
}
