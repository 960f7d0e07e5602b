//! Refresh-token sessions and revocation, kept in Redis

use anyhow::Result;
use common::cache::{RedisPool, revoked_token_key, session_key};
use tracing::info;
use uuid::Uuid;

/// One live refresh token per user; rotating or logging out revokes the
/// previous token for the rest of its lifetime.
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    refresh_ttl: u64,
}

impl SessionManager {
    pub fn new(redis_pool: RedisPool, refresh_ttl: u64) -> Self {
        Self {
            redis_pool,
            refresh_ttl,
        }
    }

    /// Record the refresh token a user may present next
    pub async fn store(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Storing session for user: {}", user_id);
        self.redis_pool
            .set(&session_key(&user_id), refresh_token, Some(self.refresh_ttl))
            .await
    }

    /// Whether `refresh_token` is the one currently on record for the user
    pub async fn is_current(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored = self.redis_pool.get(&session_key(&user_id)).await?;
        Ok(stored.as_deref() == Some(refresh_token))
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool> {
        Ok(self.redis_pool.get(&revoked_token_key(token)).await?.is_some())
    }

    /// Revoke a token until it would have expired anyway
    pub async fn revoke(&self, token: &str, remaining_secs: u64) -> Result<()> {
        if remaining_secs == 0 {
            return Ok(());
        }
        self.redis_pool
            .set(&revoked_token_key(token), "1", Some(remaining_secs))
            .await
    }

    pub async fn end(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting session for user: {}", user_id);
        self.redis_pool.delete(&session_key(&user_id)).await
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}
