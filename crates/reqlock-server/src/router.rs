//! Router assembly for the reqlock demo server.
//!
//! [`build_router`] mounts one lock-guarded catch-all route, `/{id}` for
//! any method, whose handler sleeps for the configured delay and answers
//! `succeed`. Two identical requests overlapping in time therefore show the
//! lock at work: the second one gets the acquire-fail response.

use std::time::Duration;

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::{request_lock, RequestLock};

/// Builds the demo router.
///
/// The lock is a `route_layer`, so it sees matched path parameters and
/// never runs for unmatched paths. TraceLayer provides request-level
/// logging via tracing.
pub fn build_router(lock: RequestLock, handler_delay: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/{id}",
            any(succeed).route_layer(from_fn_with_state(lock, request_lock)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(handler_delay)
}

async fn succeed(State(delay): State<Duration>) -> &'static str {
    tokio::time::sleep(delay).await;
    "succeed"
}

async fn health() -> &'static str {
    "ok"
}
