use anyhow::{Context, Result, bail};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    /// In-process store, optionally seeded from `seed_file`.
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub api_prefix: String,
    pub log_dir: String,
    pub log_level: tracing::Level,

    // Storage
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub seed_file: Option<String>,

    // Rate limiting
    pub rate_inbound_per_min: u32,
    pub rate_operations_per_min: u32,

    // Sender resolution
    pub sender_cache_ttl: Duration,
    pub sender_cache_warmup_days: u32,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "mysql".to_string())
            .to_lowercase()
            .as_str()
        {
            "mysql" => StorageBackend::MySql,
            "memory" => StorageBackend::Memory,
            other => bail!("STORAGE_BACKEND must be mysql or memory, got {other:?}"),
        };

        let database_url = match storage_backend {
            StorageBackend::MySql => Some(required("DATABASE_URL")?),
            StorageBackend::Memory => env::var("DATABASE_URL").ok(),
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed_or("LOG_LEVEL", tracing::Level::DEBUG)?,

            storage_backend,
            database_url,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout: Duration::from_secs(parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            seed_file: env::var("SEED_FILE").ok(),

            rate_inbound_per_min: parsed_or("RATE_INBOUND_PER_MIN", 120)?,
            rate_operations_per_min: parsed_or("RATE_OPERATIONS_PER_MIN", 600)?,

            sender_cache_ttl: Duration::from_secs(parsed_or("SENDER_CACHE_TTL_SECS", 300)?),
            sender_cache_warmup_days: parsed_or("SENDER_CACHE_WARMUP_DAYS", 14)?,
        })
    }

    /// Config for in-process tests: memory store, fixed secret.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            jwt_secret: "test-secret".to_string(),
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            log_level: tracing::Level::DEBUG,
            storage_backend: StorageBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            db_acquire_timeout: Duration::from_secs(1),
            seed_file: None,
            rate_inbound_per_min: 10_000,
            rate_operations_per_min: 10_000,
            sender_cache_ttl: Duration::from_secs(60),
            sender_cache_warmup_days: 14,
        }
    }
}
