//! Integration tests for the request lock middleware with the default key
//! generator.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{BoxError, Router};
use serde_json::json;
use tower::ServiceExt;

use reqlock_core::RequestContext;
use reqlock_server::router::build_router;
use reqlock_server::{request_lock, RequestLock, RequestLockBuilder};
use reqlock_storage::InMemoryStore;

const HANDLER_DELAY: Duration = Duration::from_millis(100);

async fn succeed() -> &'static str {
    tokio::time::sleep(HANDLER_DELAY).await;
    "succeed"
}

async fn explode() -> Response {
    tokio::time::sleep(HANDLER_DELAY).await;
    (StatusCode::INTERNAL_SERVER_ERROR, "exploded").into_response()
}

fn builder(store: &Arc<InMemoryStore>, ttl_ms: u64) -> RequestLockBuilder {
    RequestLock::builder()
        .store(store.clone())
        .expire_milliseconds(ttl_ms)
}

/// Blocked requests get `400 fail`, which is easy to tell apart from the
/// handler's `200 succeed`.
fn failing_with_400(builder: RequestLockBuilder) -> RequestLockBuilder {
    builder.on_acquire_fail(|_ctx: RequestContext| async {
        Ok::<_, BoxError>((StatusCode::BAD_REQUEST, "fail").into_response())
    })
}

fn app_with(lock: RequestLock) -> Router {
    Router::new()
        .route(
            "/{id}",
            any(succeed).route_layer(from_fn_with_state(lock.clone(), request_lock)),
        )
        .route(
            "/{id}/explode",
            post(explode).route_layer(from_fn_with_state(lock, request_lock)),
        )
}

fn test_app(store: &Arc<InMemoryStore>, ttl_ms: u64) -> Router {
    let lock = failing_with_400(builder(store, ttl_ms)).build().unwrap();
    app_with(lock)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn post_after(
    app: &Router,
    delay_ms: u64,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, String) {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    send(app, Method::POST, uri, body).await
}

fn succeeded() -> (StatusCode, String) {
    (StatusCode::OK, "succeed".to_string())
}

fn blocked() -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, "fail".to_string())
}

#[tokio::test]
async fn second_identical_request_is_blocked() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let (first, second) = tokio::join!(
        post_after(&app, 0, "/1", None),
        post_after(&app, 10, "/1", None),
    );

    assert_eq!(first, succeeded());
    assert_eq!(second, blocked());
    assert_eq!(store.live_count(), 0);
}

#[tokio::test]
async fn identical_request_after_release_passes() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let (first, second) = tokio::join!(
        post_after(&app, 0, "/2", None),
        post_after(&app, 150, "/2", None),
    );

    assert_eq!(first, succeeded());
    assert_eq!(second, succeeded());
}

#[tokio::test]
async fn different_parameters_are_not_blocked() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let (first, same, with_query, with_body) = tokio::join!(
        post_after(&app, 0, "/1", None),
        post_after(&app, 10, "/1", None),
        post_after(&app, 10, "/1?param=1", None),
        post_after(&app, 10, "/1", Some(json!({ "name": "steve" }))),
    );

    assert_eq!(first, succeeded());
    assert_eq!(same, blocked());
    assert_eq!(with_query, succeeded());
    assert_eq!(with_body, succeeded());
}

#[tokio::test]
async fn different_route_parameters_are_not_blocked() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let (first, second) = tokio::join!(
        post_after(&app, 0, "/1", None),
        post_after(&app, 10, "/2", None),
    );

    assert_eq!(first, succeeded());
    assert_eq!(second, succeeded());
}

#[tokio::test]
async fn empty_json_body_is_the_same_request_as_no_body() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let (first, second) = tokio::join!(
        post_after(&app, 0, "/1", None),
        post_after(&app, 10, "/1", Some(json!({}))),
    );

    assert_eq!(first, succeeded());
    assert_eq!(second, blocked());
}

#[tokio::test]
async fn body_field_order_does_not_matter() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let (first, second) = tokio::join!(
        post_after(&app, 0, "/1?b=2&a=1", Some(json!({ "x": 1, "y": 2 }))),
        post_after(&app, 10, "/1?a=1&b=2", Some(json!({ "y": 2, "x": 1 }))),
    );

    assert_eq!(first, succeeded());
    assert_eq!(second, blocked());
}

#[tokio::test]
async fn expired_lock_lets_a_second_request_through() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 50);

    let (first, second) = tokio::join!(
        post_after(&app, 0, "/3", None),
        post_after(&app, 70, "/3", None),
    );

    assert_eq!(first, succeeded());
    assert_eq!(second, succeeded());
}

#[tokio::test]
async fn handler_error_releases_the_lock() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let (status, _) = send(&app, Method::POST, "/1/explode", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(store.live_count(), 0);

    // Reaches the handler again instead of being blocked.
    let (status, _) = send(&app, Method::POST, "/1/explode", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn default_policy_answers_429() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(builder(&store, 1000).build().unwrap());

    let (first, second) = tokio::join!(
        post_after(&app, 0, "/1", None),
        post_after(&app, 10, "/1", None),
    );

    assert_eq!(first, succeeded());
    assert_eq!(second.0, StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = serde_json::from_str(&second.1).unwrap();
    assert_eq!(body["error"]["code"], "LOCKED");
    assert_eq!(body["error"]["message"], "Locked, try later");
}

#[tokio::test]
async fn malformed_body_is_rejected_before_locking() {
    let store = Arc::new(InMemoryStore::new());
    let app = test_app(&store, 1000);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/1")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.live_count(), 0);
}

#[tokio::test]
async fn oversized_body_is_413() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(builder(&store, 1000).body_limit(8).build().unwrap());

    let (status, _) = send(
        &app,
        Method::POST,
        "/1",
        Some(json!({ "payload": "much longer than eight bytes" })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn handler_receives_the_original_body() {
    async fn echo(body: String) -> String {
        body
    }

    let store = Arc::new(InMemoryStore::new());
    let lock = builder(&store, 1000).build().unwrap();
    let app = Router::new().route(
        "/echo",
        post(echo).route_layer(from_fn_with_state(lock, request_lock)),
    );

    let (status, body) = send(&app, Method::POST, "/echo", Some(json!({ "name": "steve" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"name":"steve"}"#);
}

#[tokio::test]
async fn demo_router_guards_only_the_catch_all_route() {
    let store = Arc::new(InMemoryStore::new());
    let app = build_router(builder(&store, 1000).build().unwrap(), HANDLER_DELAY);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "ok"));

    let (first, second, health) = tokio::join!(
        post_after(&app, 0, "/7", None),
        post_after(&app, 10, "/7", None),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            send(&app, Method::GET, "/health", None).await
        },
    );

    assert_eq!(first, succeeded());
    assert_eq!(second.0, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(health.0, StatusCode::OK);
}
