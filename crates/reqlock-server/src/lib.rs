//! Request-scoped distributed lock middleware for axum.
//!
//! Serializes logically identical requests (same route, same parameters)
//! through a lock record in a shared store. A request that finds the lock
//! held is answered by the acquire-fail policy instead of the handler; a
//! request that wins runs the handler and always releases the lock
//! afterwards, whatever the handler did.
//!
//! ```rust,ignore
//! let lock = RequestLock::builder()
//!     .store(Arc::new(RedisStore::connect("redis://127.0.0.1/").await?))
//!     .expire_milliseconds(1000)
//!     .build()?;
//!
//! let app = Router::new().route(
//!     "/orders/{id}",
//!     post(create_order).route_layer(middleware::from_fn_with_state(lock, request_lock)),
//! );
//! ```

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod policy;
pub mod router;

pub use config::{Backend, ConfigError, ServerConfig};
pub use coordinator::LockCoordinator;
pub use error::LockError;
pub use middleware::{request_lock, RequestLock, RequestLockBuilder};
pub use policy::{OutcomePolicy, RejectWhenLocked};
