//! The [`LockStore`] trait defining the lock authority contract.
//!
//! Both primitives must execute as a single atomic operation inside the
//! store. Splitting `acquire` into "exists?" followed by "set" lets two
//! racing requests both win; splitting `release` into "get" followed by
//! "delete" lets a request delete a lock that expired and was re-acquired
//! by someone else in between.
//!
//! All backends (RedisStore, SqliteStore, InMemoryStore) implement this
//! trait and are fully swappable behind `Arc<dyn LockStore>`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use reqlock_core::{LockKey, LockToken};

use crate::error::StoreError;

/// Conditional-acquire and compare-and-release against a shared store.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Sets `key = token` with an expiry of `ttl_ms` milliseconds, only if
    /// no unexpired record exists for `key`.
    ///
    /// Returns `true` iff the record was written.
    async fn acquire(
        &self,
        key: &LockKey,
        token: &LockToken,
        ttl_ms: u64,
    ) -> Result<bool, StoreError>;

    /// Deletes the record at `key` only if it holds `token`.
    ///
    /// Returns `true` iff a record was deleted. `false` means the lock had
    /// already expired or now belongs to another request.
    async fn release(&self, key: &LockKey, token: &LockToken) -> Result<bool, StoreError>;

    /// Physically removes expired records, returning how many were removed.
    ///
    /// Expired records are already invisible to `acquire` and `release`;
    /// this only reclaims space. Stores with native expiry keep the default.
    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// Spawns a background task calling [`LockStore::sweep_expired`] every
/// `interval`.
pub fn start_expiry_sweep(store: Arc<dyn LockStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            match store.sweep_expired().await {
                Ok(0) => {}
                Ok(swept) => tracing::info!("Swept {} expired lock record(s)", swept),
                Err(e) => tracing::warn!("Lock expiry sweep failed: {}", e),
            }
        }
    });
}
