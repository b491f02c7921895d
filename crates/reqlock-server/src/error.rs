//! Lock middleware error types with HTTP status code mapping.
//!
//! [`LockError`] covers every failure the middleware itself can produce.
//! It implements `axum::response::IntoResponse` to produce structured JSON
//! error responses with appropriate HTTP status codes. Errors raised by the
//! guarded handler never pass through this type; they stay the handler's
//! own response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use reqlock_core::KeyDerivationError;
use reqlock_storage::StoreError;

/// Message of the default busy response.
pub const LOCKED_MESSAGE: &str = "Locked, try later";

/// Structured error detail in error responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "LOCKED", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Middleware errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another request with the same key holds the lock (429).
    #[error("{}", LOCKED_MESSAGE)]
    Locked,

    /// The lock key could not be derived from the request (400).
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] KeyDerivationError),

    /// The request body exceeded the configured buffering limit (413).
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The request body stream failed while buffering (400).
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The lock store failed during acquisition (503).
    #[error("lock store unavailable: {0}")]
    Acquire(#[source] StoreError),

    /// The lock store failed during release after the handler succeeded (500).
    #[error("lock release failed: {0}")]
    Release(#[source] StoreError),

    /// A custom acquire-fail policy returned an error (500).
    #[error("acquire-fail policy failed: {0}")]
    Policy(String),
}

impl LockError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            LockError::Locked => (StatusCode::TOO_MANY_REQUESTS, "LOCKED"),
            LockError::KeyDerivation(_) | LockError::BodyRead(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            LockError::BodyTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            LockError::Acquire(_) => (StatusCode::SERVICE_UNAVAILABLE, "LOCK_STORE_UNAVAILABLE"),
            LockError::Release(_) | LockError::Policy(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for LockError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let detail = ErrorDetail {
            code: code.to_string(),
            message: self.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}
