//! Revoked session IDs, checked on every request
//!
//! A logged-out session token is still correctly signed until it expires, so
//! its ID is remembered here until then.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::DomainError;

/// Store of sessions ended before their expiry
#[async_trait]
pub trait SessionRevocations: Send + Sync + Debug {
    /// Reject the session from now on; it is forgotten after `expires_at`
    async fn revoke(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<(), DomainError>;

    /// Whether the session was revoked
    async fn is_revoked(&self, session_id: &str) -> Result<bool, DomainError>;
}

/// In-memory revocation list
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRevocations {
    revoked: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl InMemorySessionRevocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remembered sessions
    pub async fn revoked_count(&self) -> usize {
        self.revoked.read().await.len()
    }
}

#[async_trait]
impl SessionRevocations for InMemorySessionRevocations {
    async fn revoke(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<(), DomainError> {
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;

        revoked.retain(|_, expiry| *expiry > now);
        if expires_at > now {
            revoked.insert(session_id.to_string(), expires_at);
        }

        Ok(())
    }

    async fn is_revoked(&self, session_id: &str) -> Result<bool, DomainError> {
        Ok(self.revoked.read().await.contains_key(session_id))
    }
}

/// PostgreSQL revocation list in `revoked_sessions`
#[derive(Debug, Clone)]
pub struct PostgresSessionRevocations {
    pool: PgPool,
}

impl PostgresSessionRevocations {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRevocations for PostgresSessionRevocations {
    async fn revoke(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to prune sessions: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO revoked_sessions (session_id, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to revoke session: {}", e)))?;

        Ok(())
    }

    async fn is_revoked(&self, session_id: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_sessions WHERE session_id = $1)")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check session: {}", e)))
    }
}
