use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, error, info, instrument};

use crate::config::RedisConfig;

/// Cache operations used by sessions and the rate limiter
#[async_trait]
pub trait RedisServiceTrait: Send + Sync {
    async fn set_string_with_expiry(&self, key: &str, value: &str, expiry_secs: u64) -> Result<(), RedisError>;
    async fn delete(&self, key: &str) -> Result<bool, RedisError>;
    /// Increments a window counter, starting its expiry on the first hit.
    /// Returns the new count and the seconds left in the window.
    async fn increment_in_window(&self, key: &str, window_secs: u64) -> Result<(i64, i64), RedisError>;
    async fn ping(&self) -> Result<String, RedisError>;
}

#[derive(Clone)]
pub struct RedisService {
    connection_manager: ConnectionManager,
}

impl RedisService {
    /// Create a new Redis service instance with a managed connection
    #[instrument(skip(config), fields(host = %config.host, port = config.port, db = config.database))]
    pub async fn new(config: RedisConfig) -> Result<Self, RedisError> {
        info!("Initializing Redis service");

        config.validate().map_err(|e| {
            error!("Redis configuration validation failed: {}", e);
            RedisError::ConfigError(e.to_string())
        })?;

        let client = Client::open(config.get_connection_url()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            RedisError::ConnectionError(format!("Client creation failed: {}", e))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create Redis connection manager: {}", e);
            RedisError::ConnectionError(format!("Connection manager creation failed: {}", e))
        })?;

        let service = Self { connection_manager };
        RedisServiceTrait::ping(&service).await?;

        info!("Redis service initialized successfully");
        Ok(service)
    }

    fn connection(&self) -> ConnectionManager {
        self.connection_manager.clone()
    }
}

#[async_trait]
impl RedisServiceTrait for RedisService {
    #[instrument(skip(self, value), fields(key = %key, ttl_secs = expiry_secs))]
    async fn set_string_with_expiry(&self, key: &str, value: &str, expiry_secs: u64) -> Result<(), RedisError> {
        let mut conn = self.connection();
        let _: () = conn.set_ex(key, value, expiry_secs).await.map_err(|e| {
            error!("Failed to setex key '{}': {}", key, e);
            RedisError::OperationError(format!("Setex operation failed: {}", e))
        })?;
        debug!("Successfully set key '{}' with TTL", key);
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<bool, RedisError> {
        let mut conn = self.connection();
        let deleted: u64 = conn.del(key).await.map_err(|e| {
            error!("Failed to delete key '{}': {}", key, e);
            RedisError::OperationError(format!("Delete operation failed: {}", e))
        })?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self), fields(key = %key, window_secs = window_secs))]
    async fn increment_in_window(&self, key: &str, window_secs: u64) -> Result<(i64, i64), RedisError> {
        let mut conn = self.connection();
        let count: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| RedisError::OperationError(format!("Increment operation failed: {}", e)))?;

        let mut ttl: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| RedisError::OperationError(format!("TTL operation failed: {}", e)))?;

        // -1 means the key has no expiry: first hit of the window, or a lost EXPIRE
        if count == 1 || ttl < 0 {
            let _: bool = conn
                .expire(key, window_secs as i64)
                .await
                .map_err(|e| RedisError::OperationError(format!("Expire operation failed: {}", e)))?;
            ttl = window_secs as i64;
        }
        Ok((count, ttl))
    }

    async fn ping(&self) -> Result<String, RedisError> {
        let mut conn = self.connection();
        let result: String = redis::cmd("PING").query_async(&mut conn).await.map_err(|e| {
            error!("Redis ping failed: {}", e);
            RedisError::OperationError(format!("Ping failed: {}", e))
        })?;
        if result == "PONG" {
            Ok(result)
        } else {
            Err(RedisError::OperationError(format!("Unexpected ping response: {}", result)))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedisError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Operation error: {0}")]
    OperationError(String),
}

/// Key under which a logged-in user's session marker lives
pub fn session_key(user_id: &str) -> String {
    format!("user_session:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key() {
        assert_eq!(session_key("64f0"), "user_session:64f0");
    }

    #[test]
    fn test_error_display() {
        let err = RedisError::OperationError("boom".to_string());
        assert_eq!(err.to_string(), "Operation error: boom");
    }
}
