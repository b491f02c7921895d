//! Scoped release of an acquired lock.
//!
//! A [`ReleaseGuard`] is armed before the acquire call is awaited and lives
//! while a request may own a lock record. A lost or failed acquire disarms
//! it without touching the store. The normal path consumes it with
//! [`ReleaseGuard::release`]. If the guard is dropped while still armed,
//! because the handler panicked or the request future was cancelled (even
//! mid-acquire), `Drop` hands the release to the runtime instead. Either
//! way the store sees at most one release attempt per acquisition.

use std::sync::Arc;

use reqlock_core::{LockKey, LockToken};
use reqlock_storage::{LockStore, StoreError};

/// Ownership of one acquired lock record.
pub struct ReleaseGuard {
    store: Arc<dyn LockStore>,
    /// `None` once a release has been attempted.
    held: Option<(LockKey, LockToken)>,
}

impl ReleaseGuard {
    pub(crate) fn new(store: Arc<dyn LockStore>, key: LockKey, token: LockToken) -> Self {
        ReleaseGuard {
            store,
            held: Some((key, token)),
        }
    }

    /// The key this guard holds, if it has not been released yet.
    pub fn key(&self) -> Option<&LockKey> {
        self.held.as_ref().map(|(key, _)| key)
    }

    /// Forgets the lock without a store call, for an acquire that did not
    /// take effect.
    pub(crate) fn disarm(mut self) {
        self.held = None;
    }

    /// Releases the lock.
    ///
    /// `Ok(false)` means the record had already expired or been taken by
    /// another request; there is nothing left to release and the caller
    /// treats it as success.
    pub async fn release(mut self) -> Result<bool, StoreError> {
        let Some((key, token)) = self.held.take() else {
            return Ok(false);
        };
        let released = self.store.release(&key, &token).await?;
        if released {
            tracing::debug!(key = %key, "lock released");
        } else {
            tracing::debug!(key = %key, "lock expired before release");
        }
        Ok(released)
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let Some((key, token)) = self.held.take() else {
            return;
        };

        let store = Arc::clone(&self.store);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(key = %key, "releasing lock from abandoned request");
                handle.spawn(async move {
                    if let Err(e) = store.release(&key, &token).await {
                        tracing::warn!(key = %key, error = %e, "lock release failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(key = %key, "no runtime to release lock; it expires with its TTL");
            }
        }
    }
}
