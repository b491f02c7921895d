//! The configured middleware and its axum entry point.
//!
//! [`RequestLock::builder`] is the single construction point. Every option
//! is validated by [`RequestLockBuilder::build`], so a misconfigured lock
//! fails at startup rather than on the first request. Mount the result with
//! `axum::middleware::from_fn_with_state(lock, request_lock)` as a
//! `route_layer` so matched path parameters are part of the key.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use reqlock_core::{DefaultKeyGenerator, KeyGenerator};
use reqlock_storage::LockStore;

use crate::config::ConfigError;
use crate::context::{extract_context, DEFAULT_BODY_LIMIT};
use crate::coordinator::LockCoordinator;
use crate::policy::{OutcomePolicy, RejectWhenLocked};

/// A validated request lock, cheap to clone into router state.
#[derive(Clone)]
pub struct RequestLock {
    coordinator: Arc<LockCoordinator>,
    body_limit: usize,
}

impl RequestLock {
    pub fn builder() -> RequestLockBuilder {
        RequestLockBuilder::default()
    }

    pub fn coordinator(&self) -> &LockCoordinator {
        &self.coordinator
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

/// Options for [`RequestLock`].
///
/// `store` and `expire_milliseconds` are required. `key_prefix` only affects
/// the default key generator and is ignored when `key_generator` is set.
pub struct RequestLockBuilder {
    store: Option<Arc<dyn LockStore>>,
    expire_milliseconds: Option<u64>,
    key_generator: Option<Arc<dyn KeyGenerator>>,
    on_acquire_fail: Option<Arc<dyn OutcomePolicy>>,
    key_prefix: Option<String>,
    body_limit: usize,
}

impl Default for RequestLockBuilder {
    fn default() -> Self {
        RequestLockBuilder {
            store: None,
            expire_milliseconds: None,
            key_generator: None,
            on_acquire_fail: None,
            key_prefix: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RequestLockBuilder {
    /// The shared store acting as lock authority.
    pub fn store(mut self, store: Arc<dyn LockStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Lock TTL; must be greater than zero.
    pub fn expire_milliseconds(mut self, ttl_ms: u64) -> Self {
        self.expire_milliseconds = Some(ttl_ms);
        self
    }

    /// Replaces the default canonical-JSON key derivation.
    pub fn key_generator<G: KeyGenerator + 'static>(mut self, generator: G) -> Self {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    /// Replaces the default 429 response for requests that find the lock held.
    pub fn on_acquire_fail<P: OutcomePolicy + 'static>(mut self, policy: P) -> Self {
        self.on_acquire_fail = Some(Arc::new(policy));
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Largest request body buffered for key derivation.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn build(self) -> Result<RequestLock, ConfigError> {
        let store = self.store.ok_or(ConfigError::MissingStore)?;
        let ttl_ms = match self.expire_milliseconds {
            None => return Err(ConfigError::MissingExpireMilliseconds),
            Some(0) => return Err(ConfigError::InvalidExpireMilliseconds),
            Some(ttl_ms) => ttl_ms,
        };

        let key_generator: Arc<dyn KeyGenerator> = match (self.key_generator, self.key_prefix) {
            (Some(generator), _) => generator,
            (None, Some(prefix)) => Arc::new(DefaultKeyGenerator::new(prefix)),
            (None, None) => Arc::new(DefaultKeyGenerator::default()),
        };
        let policy: Arc<dyn OutcomePolicy> = match self.on_acquire_fail {
            Some(policy) => policy,
            None => Arc::new(RejectWhenLocked),
        };

        Ok(RequestLock {
            coordinator: Arc::new(LockCoordinator::new(store, ttl_ms, key_generator, policy)),
            body_limit: self.body_limit,
        })
    }
}

/// axum middleware: serializes identical requests through `lock`.
pub async fn request_lock(State(lock): State<RequestLock>, req: Request, next: Next) -> Response {
    let (ctx, req) = match extract_context(req, lock.body_limit).await {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!(error = %e, "request lock not attempted");
            return e.into_response();
        }
    };

    lock.coordinator.run(ctx, move || next.run(req)).await
}
