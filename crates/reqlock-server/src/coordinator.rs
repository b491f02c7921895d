//! One acquire / execute / release cycle per request.
//!
//! [`LockCoordinator::run`] drives a request through
//!
//! ```text
//! derive key -> acquire -+-> acquired -> handler -> release -> done
//!                        +-> busy -> acquire-fail policy -> rejected
//! ```
//!
//! The coordinator keeps no per-request state of its own between calls;
//! exclusion between requests lives entirely in the lock store. Once a lock
//! is acquired, a [`ReleaseGuard`] owns it, so the release is attempted
//! whether the handler returns, panics, or its request is cancelled.

use std::future::Future;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use reqlock_core::{KeyGenerator, LockKey, LockToken, RequestContext};
use reqlock_storage::LockStore;

use crate::error::LockError;
use crate::guard::ReleaseGuard;
use crate::policy::OutcomePolicy;

/// Runs the request lock protocol against a shared store.
pub struct LockCoordinator {
    store: Arc<dyn LockStore>,
    ttl_ms: u64,
    key_generator: Arc<dyn KeyGenerator>,
    policy: Arc<dyn OutcomePolicy>,
}

impl LockCoordinator {
    pub fn new(
        store: Arc<dyn LockStore>,
        ttl_ms: u64,
        key_generator: Arc<dyn KeyGenerator>,
        policy: Arc<dyn OutcomePolicy>,
    ) -> Self {
        LockCoordinator {
            store,
            ttl_ms,
            key_generator,
            policy,
        }
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Derives the request's key and tries to take its lock with a fresh
    /// token.
    ///
    /// Returns `Ok(None)` when another request holds the lock. Neither that
    /// nor an error path issues a release.
    pub async fn try_acquire(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<ReleaseGuard>, LockError> {
        let key = LockKey::from(self.key_generator.generate(ctx)?);
        let token = LockToken::generate();

        // Armed before the await: if this future is dropped mid-acquire, the
        // record the store may already hold still gets released.
        let guard = ReleaseGuard::new(Arc::clone(&self.store), key.clone(), token.clone());

        match self.store.acquire(&key, &token, self.ttl_ms).await {
            Ok(true) => {
                tracing::debug!(key = %key, ttl_ms = self.ttl_ms, "lock acquired");
                Ok(Some(guard))
            }
            Ok(false) => {
                guard.disarm();
                tracing::debug!(key = %key, "lock busy");
                Ok(None)
            }
            Err(e) => {
                guard.disarm();
                Err(LockError::Acquire(e))
            }
        }
    }

    /// Answers a request that lost the lock via the acquire-fail policy.
    pub async fn reject(&self, ctx: RequestContext) -> Response {
        match self.policy.on_acquire_fail(ctx).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "acquire-fail policy failed");
                LockError::Policy(e.to_string()).into_response()
            }
        }
    }

    /// Runs `downstream` under the request's lock.
    ///
    /// `downstream` is only invoked if the lock was acquired. A 4xx or 5xx
    /// response from it is the handler's failure and stays the visible
    /// outcome even if the release then fails; after a successful response,
    /// a failed release turns into a 500.
    pub async fn run<F, Fut>(&self, ctx: RequestContext, downstream: F) -> Response
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Response>,
    {
        let guard = match self.try_acquire(&ctx).await {
            Ok(Some(guard)) => guard,
            Ok(None) => return self.reject(ctx).await,
            Err(e) => {
                tracing::warn!(path = %ctx.path, error = %e, "request lock not attempted");
                return e.into_response();
            }
        };

        let key = guard.key().map(ToString::to_string).unwrap_or_default();
        let response = downstream().await;
        let status = response.status();

        match guard.release().await {
            Ok(_) => response,
            Err(e) if status.is_client_error() || status.is_server_error() => {
                tracing::warn!(key = %key, %status, error = %e, "lock release failed after handler error");
                response
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "lock release failed");
                LockError::Release(e).into_response()
            }
        }
    }
}
