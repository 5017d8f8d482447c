//! License entity and repository trait.
//!
//! Maps to the `licenses` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest};
use crate::shared::error::AppError;

/// License status matching the `licenses.status` CHECK constraint.
///
/// Expiry is not a stored status; it is derived from `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    #[default]
    Available,
    Active,
    Revoked,
}

impl LicenseStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(Self::Available),
            "active" => Some(Self::Active),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }

    pub fn from_db(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Revoked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

/// A product license identified by its serial key.
///
/// Maps to the `licenses` table:
/// - id: BIGINT PRIMARY KEY
/// - serial_key: VARCHAR(32) NOT NULL UNIQUE
/// - user_id: BIGINT NULL REFERENCES users(id)
/// - status: VARCHAR(20) NOT NULL DEFAULT 'available'
/// - expires_at / activated_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub serial_key: String,
    pub user_id: Option<i64>,
    pub status: LicenseStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl License {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// A license is usable when it is not revoked and not past its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status != LicenseStatus::Revoked && !self.is_expired_at(now)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<License>, AppError>;

    async fn find_by_serial_key(&self, serial_key: &str) -> Result<Option<License>, AppError>;

    async fn serial_key_exists(&self, serial_key: &str) -> Result<bool, AppError>;

    async fn list(
        &self,
        status: Option<LicenseStatus>,
        page: PageRequest,
    ) -> Result<Page<License>, AppError>;

    async fn create(&self, license: &License) -> Result<License, AppError>;

    /// Bind an available license to a user. Returns `None` when the row was
    /// no longer `available` (someone else activated it first).
    async fn activate(&self, id: i64, user_id: i64) -> Result<Option<License>, AppError>;

    async fn revoke(&self, id: i64) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn license(status: LicenseStatus, expires_at: Option<DateTime<Utc>>) -> License {
        let now = Utc::now();
        License {
            id: 1,
            serial_key: "ABCD-EFGH-JKLM-NPQR".into(),
            user_id: None,
            status,
            expires_at,
            activated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_validity() {
        let now = Utc::now();
        assert!(license(LicenseStatus::Available, None).is_valid_at(now));
        assert!(license(LicenseStatus::Active, Some(now + Duration::days(1))).is_valid_at(now));
        assert!(!license(LicenseStatus::Active, Some(now - Duration::days(1))).is_valid_at(now));
        assert!(!license(LicenseStatus::Revoked, None).is_valid_at(now));
    }
}
