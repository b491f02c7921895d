//! Core error types for reqlock-core.
//!
//! Key derivation is the only fallible operation in this crate. Any variant
//! is fatal for the request it was raised for: the coordinator never tries
//! to acquire a lock for a request whose key could not be derived.

use thiserror::Error;

/// Errors produced while deriving a lock key from a request.
#[derive(Debug, Error)]
pub enum KeyDerivationError {
    /// The query string could not be decoded.
    #[error("invalid query string: {reason}")]
    InvalidQuery { reason: String },

    /// The request body could not be parsed for its declared content type.
    #[error("invalid request body: {reason}")]
    InvalidBody { reason: String },

    /// Canonical serialization of the merged parameters failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A caller-supplied key generator rejected the request.
    #[error("key generator failed: {0}")]
    Custom(String),
}
