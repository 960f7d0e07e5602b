//! Redis cache module
//!
//! Holds refresh-token sessions and the revoked-token list for the
//! authentication service. Keys are namespaced by purpose so both uses can
//! share one Redis database.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::info;

const SESSION_PREFIX: &str = "session";
const REVOKED_PREFIX: &str = "revoked_token";

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("redis_url", "redis://localhost:6379")?
            .add_source(config::Environment::default())
            .build()?;

        Ok(RedisConfig {
            url: settings.get_string("redis_url")?,
        })
    }
}

/// Redis client handle; connections are multiplexed per call.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Open a Redis client for the configured URL
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.connection().await?;

        if let Some(ttl) = ttl_seconds {
            let _: () = conn.set_ex(key, value, ttl).await?;
        } else {
            let _: () = conn.set(key, value).await?;
        }

        Ok(())
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

/// Key under which a user's current refresh token is stored.
pub fn session_key(user_id: &uuid::Uuid) -> String {
    format!("{SESSION_PREFIX}:{user_id}")
}

/// Key marking a token as revoked until it would have expired anyway.
pub fn revoked_token_key(token: &str) -> String {
    format!("{REVOKED_PREFIX}:{token}")
}
