//! Binary entrypoint for the reqlock demo server.
//!
//! Configuration comes from `REQLOCK_*` environment variables; see
//! [`reqlock_server::config`] for the full list.

use std::time::Duration;

use reqlock_server::router::build_router;
use reqlock_server::{Backend, RequestLock, ServerConfig};
use reqlock_storage::start_expiry_sweep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let store = config.open_store().await?;

    // Redis expires records itself; the other backends need a sweep.
    if config.backend != Backend::Redis {
        start_expiry_sweep(store.clone(), Duration::from_secs(60));
    }

    let lock = RequestLock::builder()
        .store(store)
        .expire_milliseconds(config.expire_ms)
        .key_prefix(config.key_prefix.clone())
        .build()?;

    let app = build_router(lock, config.handler_delay);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        "reqlock server starting on {} ({:?} backend, ttl {}ms)",
        addr,
        config.backend,
        config.expire_ms
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
