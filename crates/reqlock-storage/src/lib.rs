//! Lock record storage for reqlock.
//!
//! Provides the [`LockStore`] trait, the two atomic primitives the request
//! lock protocol needs (conditional-acquire and compare-and-release), plus
//! three backends:
//!
//! - [`RedisStore`]: the shared lock authority for multi-process deployments
//! - [`SqliteStore`]: a single-host authority shared through one database file
//! - [`InMemoryStore`]: process-local, for tests and single-process servers
//!
//! # Modules
//!
//! - [`error`]: StoreError enum with all failure modes
//! - [`traits`]: LockStore trait definition and the expiry sweep task
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL schema migrations for the SQLite backend
//! - [`sqlite`]: SqliteStore implementation
//! - [`redis_store`]: RedisStore implementation

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod schema;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use redis_store::RedisStore;
pub use sqlite::SqliteStore;
pub use traits::{start_expiry_sweep, LockStore};
