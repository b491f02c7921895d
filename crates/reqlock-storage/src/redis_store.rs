//! Redis implementation of [`LockStore`].
//!
//! Both primitives run as Lua scripts so Redis executes each one as a single
//! atomic command. Scripts are sent with EVALSHA and fall back to EVAL when
//! the server's script cache does not have them yet.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use reqlock_core::{LockKey, LockToken};

use crate::error::StoreError;
use crate::traits::LockStore;

const ACQUIRE_SCRIPT: &str = r#"return redis.call("set", KEYS[1], ARGV[1], "NX", "PX", ARGV[2])"#;

const RELEASE_SCRIPT: &str = r#"if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end"#;

/// Redis-backed lock store over a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    acquire: Script,
    release: Script,
}

impl RedisStore {
    /// Connects to the Redis server at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already established connection manager.
    pub fn from_connection(conn: ConnectionManager) -> Self {
        RedisStore {
            conn,
            acquire: Script::new(ACQUIRE_SCRIPT),
            release: Script::new(RELEASE_SCRIPT),
        }
    }
}

#[async_trait]
impl LockStore for RedisStore {
    async fn acquire(
        &self,
        key: &LockKey,
        token: &LockToken,
        ttl_ms: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        // "OK" when set, nil when the key already exists.
        let reply: Option<String> = self
            .acquire
            .key(key.as_str())
            .arg(token.as_str())
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &LockKey, token: &LockToken) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release
            .key(key.as_str())
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Runs only when `REQLOCK_TEST_REDIS_URL` points at a disposable server.
    async fn test_store() -> Option<RedisStore> {
        let url = std::env::var("REQLOCK_TEST_REDIS_URL").ok()?;
        Some(RedisStore::connect(&url).await.unwrap())
    }

    fn unique_key(label: &str) -> LockKey {
        LockKey::from(format!("reqlock-test:{label}:{}", LockToken::generate()))
    }

    #[tokio::test]
    #[ignore = "requires REQLOCK_TEST_REDIS_URL"]
    async fn acquire_release_round_trip() {
        let Some(store) = test_store().await else {
            return;
        };
        let key = unique_key("round-trip");
        let owner = LockToken::generate();

        assert!(store.acquire(&key, &owner, 1000).await.unwrap());
        assert!(!store.acquire(&key, &LockToken::generate(), 1000).await.unwrap());
        assert!(!store.release(&key, &LockToken::generate()).await.unwrap());
        assert!(store.release(&key, &owner).await.unwrap());
        assert!(store.acquire(&key, &LockToken::generate(), 1000).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires REQLOCK_TEST_REDIS_URL"]
    async fn record_expires_after_ttl() {
        let Some(store) = test_store().await else {
            return;
        };
        let key = unique_key("expiry");
        let stale = LockToken::generate();

        assert!(store.acquire(&key, &stale, 50).await.unwrap());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.acquire(&key, &LockToken::generate(), 1000).await.unwrap());
        assert!(!store.release(&key, &stale).await.unwrap());
    }
}
