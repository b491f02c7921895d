//! Configuration errors and the server binary's environment settings.
//!
//! [`ServerConfig::from_env`] reads:
//! - `REQLOCK_PORT`: listen port (default: "3000")
//! - `REQLOCK_BACKEND`: `memory`, `sqlite` or `redis` (default: "memory")
//! - `REQLOCK_REDIS_URL`: Redis URL, required for the `redis` backend
//! - `REQLOCK_DB_PATH`: SQLite database path (default: "reqlock.db")
//! - `REQLOCK_EXPIRE_MS`: lock TTL in milliseconds (default: "1000")
//! - `REQLOCK_KEY_PREFIX`: key namespace (default: "lock-koa-middleware")
//! - `REQLOCK_HANDLER_DELAY_MS`: demo handler latency (default: "100")

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqlock_core::DEFAULT_KEY_PREFIX;
use reqlock_storage::{InMemoryStore, LockStore, RedisStore, SqliteStore, StoreError};

/// Errors raised while building a [`RequestLock`](crate::RequestLock) or
/// reading server settings. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("a lock store is required")]
    MissingStore,

    #[error("expire_milliseconds is required")]
    MissingExpireMilliseconds,

    #[error("expire_milliseconds must be an integer greater than zero")]
    InvalidExpireMilliseconds,

    /// A required environment variable is not set.
    #[error("{var} must be set")]
    MissingEnv { var: &'static str },

    /// An environment variable holds an unusable value.
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which store acts as lock authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
    Redis,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "sqlite" => Ok(Backend::Sqlite),
            "redis" => Ok(Backend::Redis),
            other => Err(format!("unknown backend '{other}': expected memory, sqlite or redis")),
        }
    }
}

/// Settings for the `reqlock-server` binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub backend: Backend,
    pub redis_url: Option<String>,
    pub db_path: String,
    pub expire_ms: u64,
    pub key_prefix: String,
    pub handler_delay: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let port = parse_var(&lookup, "REQLOCK_PORT", 3000)?;
        let backend = parse_var(&lookup, "REQLOCK_BACKEND", Backend::Memory)?;
        let redis_url = lookup("REQLOCK_REDIS_URL");
        let db_path = lookup("REQLOCK_DB_PATH").unwrap_or_else(|| "reqlock.db".to_string());
        let expire_ms = parse_var(&lookup, "REQLOCK_EXPIRE_MS", 1000)?;
        let key_prefix =
            lookup("REQLOCK_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
        let handler_delay_ms: u64 = parse_var(&lookup, "REQLOCK_HANDLER_DELAY_MS", 100)?;

        if expire_ms == 0 {
            return Err(ConfigError::InvalidExpireMilliseconds);
        }
        if backend == Backend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingEnv {
                var: "REQLOCK_REDIS_URL",
            });
        }

        Ok(ServerConfig {
            port,
            backend,
            redis_url,
            db_path,
            expire_ms,
            key_prefix,
            handler_delay: Duration::from_millis(handler_delay_ms),
        })
    }

    /// Opens the configured lock store.
    pub async fn open_store(&self) -> Result<Arc<dyn LockStore>, StoreError> {
        let store: Arc<dyn LockStore> = match self.backend {
            Backend::Memory => Arc::new(InMemoryStore::new()),
            Backend::Sqlite => Arc::new(SqliteStore::new(&self.db_path)?),
            Backend::Redis => {
                let url = self.redis_url.as_deref().unwrap_or("redis://127.0.0.1/");
                Arc::new(RedisStore::connect(url).await?)
            }
        };
        Ok(store)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
