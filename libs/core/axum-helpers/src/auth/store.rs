//! Token whitelist/blacklist storage.

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Tracks which token ids are live (whitelisted) and which were revoked
/// (blacklisted). Entries expire on their own after `ttl_seconds`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn whitelist(&self, jti: &str, user_id: &str, ttl_seconds: u64) -> eyre::Result<()>;
    async fn is_whitelisted(&self, jti: &str) -> eyre::Result<bool>;
    async fn revoke(&self, jti: &str) -> eyre::Result<()>;
    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> eyre::Result<()>;
    async fn is_blacklisted(&self, jti: &str) -> eyre::Result<bool>;
}

fn whitelist_key(jti: &str) -> String {
    format!("jwt:whitelist:{jti}")
}

fn blacklist_key(jti: &str) -> String {
    format!("jwt:blacklist:{jti}")
}

/// Redis-backed store. Keys are `jwt:whitelist:{jti}` and `jwt:blacklist:{jti}`.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { client: manager }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn whitelist(&self, jti: &str, user_id: &str, ttl_seconds: u64) -> eyre::Result<()> {
        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(whitelist_key(jti), user_id, ttl_seconds)
            .await?;
        Ok(())
    }

    async fn is_whitelisted(&self, jti: &str) -> eyre::Result<bool> {
        let mut conn = self.client.clone();
        Ok(conn.exists(whitelist_key(jti)).await?)
    }

    async fn revoke(&self, jti: &str) -> eyre::Result<()> {
        let mut conn = self.client.clone();
        conn.del::<_, ()>(whitelist_key(jti)).await?;
        Ok(())
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> eyre::Result<()> {
        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(blacklist_key(jti), "1", ttl_seconds)
            .await?;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> eyre::Result<bool> {
        let mut conn = self.client.clone();
        Ok(conn.exists(blacklist_key(jti)).await?)
    }
}

/// Process-local store for tests and single-node development.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<Mutex<HashMap<String, Instant>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: String, ttl_seconds: u64) -> eyre::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| eyre::eyre!("session store lock poisoned"))?;
        entries.insert(key, Instant::now() + Duration::from_secs(ttl_seconds));
        Ok(())
    }

    fn live(&self, key: &str) -> eyre::Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| eyre::eyre!("session store lock poisoned"))?;
        match entries.get(key) {
            Some(deadline) if *deadline > Instant::now() => Ok(true),
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn whitelist(&self, jti: &str, _user_id: &str, ttl_seconds: u64) -> eyre::Result<()> {
        self.put(whitelist_key(jti), ttl_seconds)
    }

    async fn is_whitelisted(&self, jti: &str) -> eyre::Result<bool> {
        self.live(&whitelist_key(jti))
    }

    async fn revoke(&self, jti: &str) -> eyre::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| eyre::eyre!("session store lock poisoned"))?;
        entries.remove(&whitelist_key(jti));
        Ok(())
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> eyre::Result<()> {
        self.put(blacklist_key(jti), ttl_seconds)
    }

    async fn is_blacklisted(&self, jti: &str) -> eyre::Result<bool> {
        self.live(&blacklist_key(jti))
    }
}
