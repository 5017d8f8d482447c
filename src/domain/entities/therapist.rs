//! Therapist entity and repository trait.
//!
//! Maps to the `therapists` table; `full_name` is joined from `users`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest};
use crate::shared::error::AppError;

/// A service provider.
///
/// Maps to the `therapists` table:
/// - id: BIGINT PRIMARY KEY
/// - user_id: BIGINT NOT NULL UNIQUE REFERENCES users(id)
/// - specialization: VARCHAR(100) NOT NULL
/// - bio: TEXT NULL
/// - license_number: VARCHAR(64) NULL
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: i64,
    pub user_id: i64,
    /// Read-only, from the linked user
    pub full_name: String,
    pub specialization: String,
    pub bio: Option<String>,
    pub license_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct TherapistFilter {
    /// Case-insensitive substring match
    pub specialization: Option<String>,
    pub include_inactive: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TherapistRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Therapist>, AppError>;

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Therapist>, AppError>;

    async fn list(
        &self,
        filter: &TherapistFilter,
        page: PageRequest,
    ) -> Result<Page<Therapist>, AppError>;

    /// Insert the profile. With `promote_user`, the owner's role becomes
    /// `therapist` in the same transaction.
    async fn create(&self, therapist: &Therapist, promote_user: bool)
        -> Result<Therapist, AppError>;

    /// Persist specialization, bio, license number and active flag.
    async fn update(&self, therapist: &Therapist) -> Result<Therapist, AppError>;
}
