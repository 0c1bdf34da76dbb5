//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};

use super::{CacheBackend, CacheError, KeyPattern};

/// Reconnect attempts made by the connection manager before a call fails.
const CONNECT_RETRIES: usize = 1;

/// Redis-backed cache storage. Entries expire server-side via `PSETEX`.
///
/// Holds one multiplexed connection for its whole life; the manager
/// reconnects transparently after the server drops it.
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    /// Open the client and establish the shared connection.
    pub async fn connect(connection_url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(connection_url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let config = ConnectionManagerConfig::new().set_number_of_retries(CONNECT_RETRIES);
        let connection = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { connection })
    }

    // `ConnectionManager` clones share one underlying connection.
    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// Round-trip a `PING` to verify the server is reachable.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection();
        // Redis rejects a zero expiry.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        conn.pset_ex::<_, _, ()>(key, value, millis)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn invalidate(&self, pattern: &KeyPattern) -> Result<usize, CacheError> {
        let mut conn = self.connection();
        let keys: Vec<String> = conn
            .keys(pattern.to_redis_pattern())
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;
        if keys.is_empty() {
            return Ok(0);
        }
        conn.del(&keys)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.connection();
        let () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;
        Ok(())
    }

    async fn entry_count(&self) -> Result<usize, CacheError> {
        let mut conn = self.connection();
        redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").finish_non_exhaustive()
    }
}
