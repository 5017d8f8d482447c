//! Commission entity and repository trait.
//!
//! Maps to the `commissions` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest};
use crate::shared::error::AppError;

/// Commission status matching the `commissions.status` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    #[default]
    Pending,
    Approved,
    Paid,
    Cancelled,
}

impl CommissionStatus {
    pub const ALL: [CommissionStatus; 4] = [
        CommissionStatus::Pending,
        CommissionStatus::Approved,
        CommissionStatus::Paid,
        CommissionStatus::Cancelled,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn from_db(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Transitions an administrator may apply.
    pub fn can_transition_to(&self, next: CommissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Cancelled)
                | (Self::Approved, Self::Paid)
                | (Self::Approved, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payout owed to an affiliate for one booking.
///
/// Maps to the `commissions` table:
/// - id: BIGINT PRIMARY KEY
/// - affiliate_id: BIGINT NOT NULL REFERENCES affiliates(id)
/// - booking_id: BIGINT NOT NULL UNIQUE REFERENCES bookings(id)
/// - amount: NUMERIC(10,2) NOT NULL
/// - rate: NUMERIC(5,2) NOT NULL (rate applied at booking time)
/// - status: VARCHAR(20) NOT NULL DEFAULT 'pending'
/// - paid_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    pub affiliate_id: i64,
    pub booking_id: i64,
    pub amount: Decimal,
    pub rate: Decimal,
    pub status: CommissionStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommissionFilter {
    pub status: Option<CommissionStatus>,
    pub affiliate_id: Option<i64>,
}

/// Count and sum of commissions in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionTotal {
    pub status: CommissionStatus,
    pub count: i64,
    pub amount: Decimal,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommissionRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Commission>, AppError>;

    async fn list(
        &self,
        filter: &CommissionFilter,
        page: PageRequest,
    ) -> Result<Page<Commission>, AppError>;

    /// Totals per status; statuses without rows are omitted.
    async fn totals(&self, affiliate_id: Option<i64>) -> Result<Vec<CommissionTotal>, AppError>;

    /// Move a commission from `from` to `to`. Returns `None` when the
    /// stored status is no longer `from` (or the row is gone).
    async fn update_status(
        &self,
        id: i64,
        from: CommissionStatus,
        to: CommissionStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Commission>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use CommissionStatus::*;

    #[test_case(Pending, Approved, true)]
    #[test_case(Pending, Cancelled, true)]
    #[test_case(Pending, Paid, false; "cannot pay before approval")]
    #[test_case(Approved, Paid, true)]
    #[test_case(Approved, Cancelled, true)]
    #[test_case(Approved, Pending, false)]
    #[test_case(Paid, Cancelled, false; "paid is terminal")]
    #[test_case(Cancelled, Approved, false; "cancelled is terminal")]
    #[test_case(Pending, Pending, false; "no-op is not a transition")]
    fn test_transitions(from: CommissionStatus, to: CommissionStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(Paid.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Approved.is_terminal());
    }
}
