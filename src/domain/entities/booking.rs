//! Booking entity, read repository and transactional store.
//!
//! Maps to the `bookings` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Affiliate, Commission, CommissionStatus, Service};
use crate::domain::value_objects::{Page, PageRequest, TimeSlot};
use crate::shared::error::AppError;

/// Booking status matching the `bookings.status` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn from_db(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Whether a booking in this status keeps its time slot occupied.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scheduled appointment for one service.
///
/// Maps to the `bookings` table:
/// - id: BIGINT PRIMARY KEY
/// - service_id / therapist_id: BIGINT NOT NULL
/// - affiliate_id: BIGINT NULL REFERENCES affiliates(id)
/// - client_user_id: BIGINT NULL REFERENCES users(id)
/// - client_name / client_email / client_phone
/// - booking_date: DATE, start_time / end_time: TIME
/// - status: VARCHAR(20) NOT NULL DEFAULT 'pending'
/// - total_amount: NUMERIC(10,2) NOT NULL
/// - notes: TEXT NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub service_id: i64,
    pub therapist_id: i64,
    pub affiliate_id: Option<i64>,
    pub client_user_id: Option<i64>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// The bookings a non-admin may reach: those with their therapist profile,
/// their affiliate profile, or booked under their account. Any match admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingVisibility {
    pub therapist_id: Option<i64>,
    pub affiliate_id: Option<i64>,
    pub client_user_id: i64,
}

impl BookingVisibility {
    pub fn admits(&self, booking: &Booking) -> bool {
        self.therapist_id == Some(booking.therapist_id)
            || (self.affiliate_id.is_some() && booking.affiliate_id == self.affiliate_id)
            || booking.client_user_id == Some(self.client_user_id)
    }
}

/// Filters for booking listings. The plain fields are combined with AND;
/// `visible_to` adds the OR-ed visibility clause of a [`BookingVisibility`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub therapist_id: Option<i64>,
    pub affiliate_id: Option<i64>,
    pub client_user_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub visible_to: Option<BookingVisibility>,
}

impl BookingFilter {
    /// In-memory counterpart of the SQL `WHERE` clause
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self.therapist_id.map_or(true, |id| booking.therapist_id == id)
            && self.affiliate_id.map_or(true, |id| booking.affiliate_id == Some(id))
            && self
                .client_user_id
                .map_or(true, |id| booking.client_user_id == Some(id))
            && self.date_from.map_or(true, |d| booking.booking_date >= d)
            && self.date_to.map_or(true, |d| booking.booking_date <= d)
            && self.visible_to.map_or(true, |scope| scope.admits(booking))
    }
}

/// Read access plus the entry point for transactional writes.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    type Tx: BookingTransaction + 'static;

    /// Open a database transaction.
    async fn begin(&self) -> Result<Self::Tx, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, AppError>;

    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> Result<Page<Booking>, AppError>;

    /// Slots held by pending/confirmed bookings of a therapist on a date.
    async fn occupied_slots(
        &self,
        therapist_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, AppError>;
}

/// Writes that must land atomically. Dropping the value without calling
/// [`BookingTransaction::commit`] rolls everything back.
#[async_trait]
pub trait BookingTransaction: Send {
    /// Active service of an active therapist. Locks the therapist row until
    /// the transaction ends so concurrent placements for the same therapist
    /// run one after another.
    async fn lock_active_service(&mut self, service_id: i64) -> Result<Option<Service>, AppError>;

    /// Whether a pending/confirmed booking of the therapist overlaps `slot`.
    async fn has_conflict(
        &mut self,
        therapist_id: i64,
        date: NaiveDate,
        slot: &TimeSlot,
    ) -> Result<bool, AppError>;

    /// Active affiliate owning the referral code.
    async fn find_active_affiliate(&mut self, referral_code: &str) -> Result<Option<Affiliate>, AppError>;

    async fn insert_booking(&mut self, booking: &Booking) -> Result<Booking, AppError>;

    async fn insert_commission(&mut self, commission: &Commission) -> Result<Commission, AppError>;

    /// Load a booking, locking its row.
    async fn lock_booking(&mut self, id: i64) -> Result<Option<Booking>, AppError>;

    async fn set_booking_status(&mut self, id: i64, status: BookingStatus) -> Result<Booking, AppError>;

    async fn commission_for_booking(&mut self, booking_id: i64) -> Result<Option<Commission>, AppError>;

    async fn set_commission_status(
        &mut self,
        commission_id: i64,
        status: CommissionStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Commission, AppError>;

    async fn commit(self) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(BookingStatus::Pending, true)]
    #[test_case(BookingStatus::Confirmed, true)]
    #[test_case(BookingStatus::Cancelled, false)]
    #[test_case(BookingStatus::Completed, false)]
    fn test_occupies_slot(status: BookingStatus, expected: bool) {
        assert_eq!(status.occupies_slot(), expected);
    }

    #[test]
    fn test_status_strings() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("done"), None);
        assert_eq!(BookingStatus::from_db("done"), BookingStatus::Pending);
        assert_eq!(
            serde_json::to_string(&BookingStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
