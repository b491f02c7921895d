//! Request identity and lock-key derivation for reqlock.
//!
//! This crate holds the pure, I/O-free half of the request lock protocol:
//! the [`RequestContext`] a key is derived from, the [`KeyGenerator`]
//! capability with its canonical-JSON default, and the [`LockKey`] /
//! [`LockToken`] values exchanged with the lock store.

pub mod context;
pub mod error;
pub mod key;
pub mod token;

// Re-export commonly used types
pub use context::RequestContext;
pub use error::KeyDerivationError;
pub use key::{DefaultKeyGenerator, KeyGenerator, LockKey, DEFAULT_KEY_PREFIX};
pub use token::LockToken;
