//! In-memory implementation of [`LockStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and single-process
//! servers. Records live in a `DashMap`; each primitive runs under the
//! shard lock of its key, which makes it atomic with respect to every other
//! operation on the same key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use reqlock_core::{LockKey, LockToken};

use crate::error::StoreError;
use crate::traits::LockStore;

#[derive(Debug, Clone)]
struct LockRecord {
    token: LockToken,
    expires_at: Instant,
}

impl LockRecord {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local lock store with TTL expiry.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<LockKey, LockRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an unexpired record exists for `key`.
    pub fn is_locked(&self, key: &LockKey) -> bool {
        let now = Instant::now();
        self.records
            .get(key)
            .map(|record| record.is_live(now))
            .unwrap_or(false)
    }

    /// Number of unexpired records.
    pub fn live_count(&self) -> usize {
        let now = Instant::now();
        self.records.iter().filter(|r| r.is_live(now)).count()
    }
}

#[async_trait]
impl LockStore for InMemoryStore {
    async fn acquire(
        &self,
        key: &LockKey,
        token: &LockToken,
        ttl_ms: u64,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let record = LockRecord {
            token: token.clone(),
            expires_at: now + Duration::from_millis(ttl_ms),
        };

        match self.records.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_live(now) {
                    Ok(false)
                } else {
                    entry.insert(record);
                    Ok(true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &LockKey, token: &LockToken) -> Result<bool, StoreError> {
        let now = Instant::now();
        let removed = self
            .records
            .remove_if(key, |_, record| record.token == *token && record.is_live(now));
        Ok(removed.is_some())
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, record| record.is_live(now));
        Ok(before.saturating_sub(self.records.len()))
    }
}
