//! Storage error types for reqlock-storage.
//!
//! [`StoreError`] covers transport and backend failures. A lock that is
//! already held is not an error: `acquire` reports it as `Ok(false)`.

use thiserror::Error;

/// Errors produced by lock store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis command or connection failure.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// SQLite statement or connection failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// The system clock is set before the Unix epoch.
    #[error("clock error: {0}")]
    Clock(String),
}
