//! Redis client implementation with connection management

use crate::Result;
use redis::{AsyncCommands, aio::ConnectionManager};

/// Redis client with automatic reconnection.
///
/// `ConnectionManager` is a cheap handle over one multiplexed connection, so
/// every operation clones it and the client can be shared behind `&self`.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Connect to Redis server
    ///
    /// Supports both redis:// and rediss:// (TLS) URLs
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Handle for operations not wrapped here (scripts, pipelines)
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    // ============================================================================
    // Key-Value Operations
    // ============================================================================

    /// GET - Get value by key
    pub async fn get<T: redis::FromRedisValue>(&self, key: &str) -> Result<Option<T>> {
        self.connection().get(key).await
    }

    /// SETEX - Set key with expiry in seconds
    pub async fn set_ex<V>(&self, key: &str, value: V, seconds: u64) -> Result<()>
    where
        V: redis::ToRedisArgs + Send + Sync,
    {
        self.connection().set_ex(key, value, seconds).await
    }

    /// DEL - Delete a key
    pub async fn del(&self, key: &str) -> Result<i64> {
        self.connection().del(key).await
    }

    // ============================================================================
    // Server
    // ============================================================================

    /// TIME - Server clock as fractional unix seconds
    pub async fn server_time(&self) -> Result<f64> {
        let (secs, micros): (u64, u64) = redis::cmd("TIME")
            .query_async(&mut self.connection())
            .await?;
        Ok(secs as f64 + micros as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_basic_operations() -> Result<()> {
        let client = RedisClient::connect("redis://localhost:6379").await?;

        client.set_ex("intake_test_key", "test_value", 10).await?;
        let value: Option<String> = client.get("intake_test_key").await?;
        assert_eq!(value, Some("test_value".to_string()));

        client.del("intake_test_key").await?;
        let value: Option<String> = client.get("intake_test_key").await?;
        assert_eq!(value, None);

        Ok(())
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_server_time_is_monotonic_enough() -> Result<()> {
        let client = RedisClient::connect("redis://localhost:6379").await?;

        let first = client.server_time().await?;
        let second = client.server_time().await?;
        assert!(first > 1_600_000_000.0);
        assert!(second >= first);

        Ok(())
    }
}
