//! Single-use lock ownership tokens.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Opaque proof of ownership for one acquisition attempt.
///
/// Generated from a v4 UUID (122 random bits) so two in-flight requests
/// never share a token. The value is what the store records under the lock
/// key and what compare-and-release checks against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LockToken(String);

impl LockToken {
    /// Generates a fresh token.
    pub fn generate() -> Self {
        LockToken(Uuid::new_v4().simple().to_string())
    }

    /// The token as stored in the lock record.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
