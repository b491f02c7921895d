//! SQLite implementation of [`LockStore`].
//!
//! [`SqliteStore`] keeps lock records in a single `lock_records` table.
//! Each primitive is exactly one SQL statement, so SQLite's write lock makes
//! it atomic across every connection to the same database file, including
//! connections from other processes. Expiry timestamps are wall-clock
//! milliseconds since the Unix epoch because they are compared across
//! processes.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use reqlock_core::{LockKey, LockToken};

use crate::error::StoreError;
use crate::traits::LockStore;

/// Inserts a record, or takes over an existing one only if it has expired.
/// `changes()` is 1 when either write happened and 0 when a live record
/// blocked it.
const ACQUIRE_SQL: &str = "\
    INSERT INTO lock_records (key, token, expires_at_ms) VALUES (?1, ?2, ?3 + ?4) \
    ON CONFLICT(key) DO UPDATE SET token = excluded.token, expires_at_ms = excluded.expires_at_ms \
    WHERE lock_records.expires_at_ms <= ?3";

const RELEASE_SQL: &str =
    "DELETE FROM lock_records WHERE key = ?1 AND token = ?2 AND expires_at_ms > ?3";

const SWEEP_SQL: &str = "DELETE FROM lock_records WHERE expires_at_ms <= ?1";

/// SQLite-backed implementation of [`LockStore`].
///
/// `rusqlite::Connection` is `!Sync`, so it sits behind an async mutex.
/// The mutex only serializes this process's statements; exclusion between
/// requests comes from the single-statement primitives.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

fn now_ms() -> Result<i64, StoreError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| StoreError::Clock(e.to_string()))?;
    Ok(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

#[async_trait]
impl LockStore for SqliteStore {
    async fn acquire(
        &self,
        key: &LockKey,
        token: &LockToken,
        ttl_ms: u64,
    ) -> Result<bool, StoreError> {
        let now = now_ms()?;
        let ttl = i64::try_from(ttl_ms).unwrap_or(i64::MAX);
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            ACQUIRE_SQL,
            params![key.as_str(), token.as_str(), now, ttl],
        )?;
        Ok(changed == 1)
    }

    async fn release(&self, key: &LockKey, token: &LockToken) -> Result<bool, StoreError> {
        let now = now_ms()?;
        let conn = self.conn.lock().await;
        let changed = conn.execute(RELEASE_SQL, params![key.as_str(), token.as_str(), now])?;
        Ok(changed == 1)
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let now = now_ms()?;
        let conn = self.conn.lock().await;
        Ok(conn.execute(SWEEP_SQL, params![now])?)
    }
}
