use super::config::JwtConfig;
use super::store::{RedisSessionStore, SessionStore};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Access token lifetime in seconds (15 minutes).
pub const ACCESS_TOKEN_TTL: i64 = 900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id.
    pub sub: String,
    pub account: String,
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    /// Token id, the key in the whitelist/blacklist.
    pub jti: String,
}

impl JwtClaims {
    /// Seconds until expiry, at least 1 so store TTLs stay valid.
    pub fn remaining_ttl(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(1) as u64
    }
}

/// A freshly signed and whitelisted access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: JwtClaims,
    pub expires_in: i64,
}

/// Hybrid JWT + store authentication: tokens are stateless to verify but only
/// honoured while their `jti` is whitelisted and not blacklisted.
#[derive(Clone)]
pub struct JwtRedisAuth {
    secret: Arc<str>,
    access_token_ttl: i64,
    store: Arc<dyn SessionStore>,
}

impl JwtRedisAuth {
    pub fn new(manager: ConnectionManager, config: &JwtConfig) -> Self {
        tracing::info!("JWT + Redis auth initialized");
        Self::with_store(Arc::new(RedisSessionStore::new(manager)), config)
    }

    /// Uses an arbitrary session store, e.g. [`InMemorySessionStore`](super::InMemorySessionStore) in tests.
    pub fn with_store(store: Arc<dyn SessionStore>, config: &JwtConfig) -> Self {
        Self {
            secret: Arc::from(config.secret.as_str()),
            access_token_ttl: config.access_token_ttl,
            store,
        }
    }

    pub fn access_token_ttl(&self) -> i64 {
        self.access_token_ttl
    }

    /// Signs an access token without registering it.
    pub fn create_access_token(
        &self,
        user_id: i64,
        account: &str,
        roles: &[String],
    ) -> eyre::Result<(String, JwtClaims)> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            account: account.to_string(),
            roles: roles.to_vec(),
            exp: (now + Duration::seconds(self.access_token_ttl)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok((token, claims))
    }

    /// Signs a token and whitelists it for its whole lifetime.
    pub async fn open_session(
        &self,
        user_id: i64,
        account: &str,
        roles: &[String],
    ) -> eyre::Result<IssuedToken> {
        let (token, claims) = self.create_access_token(user_id, account, roles)?;
        self.store
            .whitelist(&claims.jti, &claims.sub, self.access_token_ttl.max(1) as u64)
            .await?;

        tracing::debug!(user_id, jti = %claims.jti, "session opened");
        Ok(IssuedToken {
            token,
            claims,
            expires_in: self.access_token_ttl,
        })
    }

    /// Checks signature and expiry only.
    pub fn verify_token(&self, token: &str) -> eyre::Result<JwtClaims> {
        let data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }

    pub async fn is_token_whitelisted(&self, jti: &str) -> eyre::Result<bool> {
        self.store.is_whitelisted(jti).await
    }

    pub async fn is_token_blacklisted(&self, jti: &str) -> eyre::Result<bool> {
        self.store.is_blacklisted(jti).await
    }

    /// Ends a session: drops the whitelist entry and blacklists the token for
    /// the rest of its lifetime.
    pub async fn revoke(&self, claims: &JwtClaims) -> eyre::Result<()> {
        self.store.revoke(&claims.jti).await?;
        self.store
            .blacklist(&claims.jti, claims.remaining_ttl())
            .await?;
        tracing::debug!(jti = %claims.jti, "session revoked");
        Ok(())
    }
}
