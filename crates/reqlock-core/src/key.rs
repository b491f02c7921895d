//! Lock key derivation.
//!
//! A lock key names "the same logical request". The default derivation
//! hashes the canonical JSON form of the request's merged parameters with
//! blake3 and prefixes it with a namespace and the route path:
//!
//! ```text
//! lock-koa-middleware:/orders/1:<64 hex chars>
//! ```
//!
//! # Determinism
//!
//! Two requests with the same path and the same parameter set always get
//! the same key, regardless of the order parameters arrived in. This holds
//! because object keys are re-inserted in sorted order at every nesting
//! level before serialization, so the output does not depend on whether
//! `serde_json::Map` preserves insertion order in the final build.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::error::KeyDerivationError;

/// Namespace prefix used by [`DefaultKeyGenerator::default`].
pub const DEFAULT_KEY_PREFIX: &str = "lock-koa-middleware";

/// Store key identifying one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LockKey(String);

impl LockKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LockKey {
    fn from(key: String) -> Self {
        LockKey(key)
    }
}

impl From<&str> for LockKey {
    fn from(key: &str) -> Self {
        LockKey(key.to_string())
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a request to the key it is serialized on.
///
/// Implemented for every `Fn(&RequestContext) -> Result<String, _>`, so a
/// closure can stand in for [`DefaultKeyGenerator`]. Uniqueness of custom
/// keys is the implementor's responsibility.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, ctx: &RequestContext) -> Result<String, KeyDerivationError>;
}

impl<F> KeyGenerator for F
where
    F: Fn(&RequestContext) -> Result<String, KeyDerivationError> + Send + Sync,
{
    fn generate(&self, ctx: &RequestContext) -> Result<String, KeyDerivationError> {
        self(ctx)
    }
}

/// Canonical-JSON content hashing over path + merged parameters.
#[derive(Debug, Clone)]
pub struct DefaultKeyGenerator {
    prefix: String,
}

impl DefaultKeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        DefaultKeyGenerator {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for DefaultKeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl KeyGenerator for DefaultKeyGenerator {
    fn generate(&self, ctx: &RequestContext) -> Result<String, KeyDerivationError> {
        let params = Value::Object(ctx.merged_params());
        let digest = digest_params(&params)?;
        let path = ctx.path.strip_suffix('/').unwrap_or(&ctx.path);
        Ok(format!("{}:{}:{}", self.prefix, path, digest))
    }
}

/// Hex blake3 digest of the canonical JSON form of `params`.
pub fn digest_params(params: &Value) -> Result<String, KeyDerivationError> {
    let bytes = serde_json::to_vec(&canonicalize(params))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Rebuilds `value` with every object's keys inserted in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut names: Vec<&String> = fields.keys().collect();
            names.sort();
            let mut sorted = Map::with_capacity(fields.len());
            for name in names {
                sorted.insert(name.clone(), canonicalize(&fields[name.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
