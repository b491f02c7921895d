//! What a request gets when its lock is already held.
//!
//! An [`OutcomePolicy`] replaces the guarded handler for a request that lost
//! the acquisition race. It only ever sees the [`RequestContext`], so it has
//! no way to run the handler. Any `async` closure taking a `RequestContext`
//! and returning `Result<Response, BoxError>` is a policy.

use std::future::Future;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use axum::BoxError;

use reqlock_core::RequestContext;

use crate::error::LockError;

#[async_trait]
pub trait OutcomePolicy: Send + Sync {
    /// Builds the response for a request whose lock is held elsewhere.
    ///
    /// An `Err` is surfaced like a handler failure (500).
    async fn on_acquire_fail(&self, ctx: RequestContext) -> Result<Response, BoxError>;
}

#[async_trait]
impl<F, Fut> OutcomePolicy for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    async fn on_acquire_fail(&self, ctx: RequestContext) -> Result<Response, BoxError> {
        self(ctx).await
    }
}

/// Default policy: `429 Too Many Requests` with a short JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectWhenLocked;

#[async_trait]
impl OutcomePolicy for RejectWhenLocked {
    async fn on_acquire_fail(&self, _ctx: RequestContext) -> Result<Response, BoxError> {
        Ok(LockError::Locked.into_response())
    }
}
