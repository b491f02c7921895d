//! Builds a [`RequestContext`] from an axum request.
//!
//! The body has to be read to be part of the lock key, so it is buffered
//! here (up to a limit) and handed back to the downstream handler as a
//! fresh body with the same bytes.
//!
//! Body parsing follows the content type:
//! - `application/json` and `*/*+json`: parsed as JSON
//! - `application/x-www-form-urlencoded`: decoded like a query string
//! - anything else, or an empty body: `null`, contributing no parameters

use std::collections::BTreeMap;
use std::error::Error as _;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use reqlock_core::{KeyDerivationError, RequestContext};

use crate::error::LockError;

/// Default cap on buffered request bodies (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Splits `req` into its lock identity and a re-assembled request.
pub async fn extract_context(
    req: Request,
    body_limit: usize,
) -> Result<(RequestContext, Request), LockError> {
    let (mut parts, body) = req.into_parts();

    let params = path_params(&mut parts).await;
    let query = match parts.uri.query() {
        Some(raw) => decode_pairs(raw).map_err(|reason| KeyDerivationError::InvalidQuery { reason })?,
        None => Map::new(),
    };

    let bytes = read_body(body, body_limit).await?;
    let body = parse_body(&parts.headers, &bytes)?;

    let ctx = RequestContext {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query,
        params,
        body,
        headers: header_map(&parts.headers),
    };

    Ok((ctx, Request::from_parts(parts, Body::from(bytes))))
}

/// Matched route parameters; empty when the middleware runs outside a route.
async fn path_params(parts: &mut Parts) -> Map<String, Value> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(raw) => raw
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect(),
        Err(_) => Map::new(),
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, LockError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let mut source = e.source();
        while let Some(err) = source {
            if err.is::<LengthLimitError>() {
                return LockError::BodyTooLarge { limit };
            }
            source = err.source();
        }
        LockError::BodyRead(e.to_string())
    })
}

fn parse_body(headers: &HeaderMap, bytes: &Bytes) -> Result<Value, KeyDerivationError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    let essence = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if essence == "application/json" || essence.ends_with("+json") {
        serde_json::from_slice(bytes).map_err(|e| KeyDerivationError::InvalidBody {
            reason: e.to_string(),
        })
    } else if essence == "application/x-www-form-urlencoded" {
        let raw = std::str::from_utf8(bytes).map_err(|e| KeyDerivationError::InvalidBody {
            reason: e.to_string(),
        })?;
        decode_pairs(raw)
            .map(Value::Object)
            .map_err(|reason| KeyDerivationError::InvalidBody { reason })
    } else {
        Ok(Value::Null)
    }
}

/// Decodes `a=1&b=2&a=3` into `{"a": ["1", "3"], "b": "2"}`.
fn decode_pairs(raw: &str) -> Result<Map<String, Value>, String> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(raw).map_err(|e| e.to_string())?;

    let mut decoded = Map::new();
    for (name, value) in pairs {
        let value = Value::String(value);
        match decoded.get_mut(&name) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                decoded.insert(name, value);
            }
        }
    }
    Ok(decoded)
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}
