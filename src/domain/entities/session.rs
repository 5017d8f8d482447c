//! User Session entity and repository trait.
//!
//! Maps to the `user_sessions` table in the database schema.
//! Used for refresh token management.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Represents a refresh-token session.
///
/// Maps to the `user_sessions` table:
/// - id: UUID PRIMARY KEY
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - refresh_token_hash: VARCHAR(64) NOT NULL UNIQUE (SHA-256 hex)
/// - user_agent: TEXT NULL
/// - expires_at: TIMESTAMPTZ NOT NULL
/// - created_at / last_used_at: TIMESTAMPTZ
/// - revoked_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    /// SHA-256 hash of the refresh token (raw tokens are never stored)
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a new session.
    pub fn new(user_id: i64, refresh_token_hash: String, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash,
            user_agent: None,
            expires_at,
            created_at: now,
            last_used_at: now,
            revoked_at: None,
        }
    }

    /// Check if the session is currently active (not expired, not revoked).
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

/// Repository trait for Session data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find a non-revoked session by refresh token hash.
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AppError>;

    async fn create(&self, session: &Session) -> Result<Session, AppError>;

    /// Swap in a new refresh token hash (token rotation).
    async fn rotate(
        &self,
        id: Uuid,
        new_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Revoke a session (set revoked_at).
    async fn revoke(&self, id: Uuid) -> Result<(), AppError>;

    /// Revoke every open session of a user; returns how many were revoked.
    async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, AppError>;
}
