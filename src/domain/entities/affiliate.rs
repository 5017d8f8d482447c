//! Affiliate entity and repository trait.
//!
//! Maps to the `affiliates` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest};
use crate::shared::error::AppError;

/// Affiliate status matching the `affiliates.status` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AffiliateStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl AffiliateStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    pub fn from_db(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Inactive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

/// A user who refers clients with a referral code.
///
/// Maps to the `affiliates` table:
/// - id: BIGINT PRIMARY KEY
/// - user_id: BIGINT NOT NULL UNIQUE REFERENCES users(id)
/// - referral_code: VARCHAR(16) NOT NULL UNIQUE
/// - commission_rate: NUMERIC(5,2) NOT NULL CHECK (0..=100)
/// - status: VARCHAR(20) NOT NULL DEFAULT 'active'
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affiliate {
    pub id: i64,
    pub user_id: i64,
    pub referral_code: String,
    /// Percentage, e.g. `12.50`
    pub commission_rate: Decimal,
    pub status: AffiliateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Affiliate {
    pub fn is_active(&self) -> bool {
        self.status == AffiliateStatus::Active
    }
}

/// Aggregates shown on the affiliate detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AffiliateStats {
    pub total_bookings: i64,
    pub pending_commission: Decimal,
    pub approved_commission: Decimal,
    pub paid_commission: Decimal,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AffiliateRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Affiliate>, AppError>;

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Affiliate>, AppError>;

    async fn find_by_code(&self, referral_code: &str) -> Result<Option<Affiliate>, AppError>;

    async fn code_exists(&self, referral_code: &str) -> Result<bool, AppError>;

    async fn list(
        &self,
        status: Option<AffiliateStatus>,
        page: PageRequest,
    ) -> Result<Page<Affiliate>, AppError>;

    /// Insert the profile. With `promote_user`, the owner's role becomes
    /// `affiliate` in the same transaction.
    async fn create(&self, affiliate: &Affiliate, promote_user: bool)
        -> Result<Affiliate, AppError>;

    /// Persist commission rate and status.
    async fn update(&self, affiliate: &Affiliate) -> Result<Affiliate, AppError>;

    async fn stats(&self, affiliate_id: i64) -> Result<AffiliateStats, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_db_fallback() {
        assert_eq!(AffiliateStatus::parse("SUSPENDED"), Some(AffiliateStatus::Suspended));
        assert_eq!(AffiliateStatus::parse("deleted"), None);
        assert_eq!(AffiliateStatus::from_db("deleted"), AffiliateStatus::Inactive);
    }
}
