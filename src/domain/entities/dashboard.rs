//! Read-only aggregates for the dashboard views.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{BookingStatus, CommissionTotal};
use crate::shared::error::AppError;

/// Booking counts keyed by status plus the revenue of completed bookings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingBreakdown {
    pub by_status: HashMap<BookingStatus, i64>,
    pub completed_revenue: Decimal,
}

impl BookingBreakdown {
    pub fn total(&self) -> i64 {
        self.by_status.values().sum()
    }

    pub fn count(&self, status: BookingStatus) -> i64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Head counts shown to administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformCounts {
    pub users: i64,
    pub therapists: i64,
    pub affiliates: i64,
}

/// Which bookings a breakdown covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    All,
    Therapist(i64),
    Affiliate(i64),
    Client(i64),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn platform_counts(&self) -> Result<PlatformCounts, AppError>;

    async fn booking_breakdown(&self, scope: BookingScope) -> Result<BookingBreakdown, AppError>;

    async fn commission_totals(&self, affiliate_id: Option<i64>) -> Result<Vec<CommissionTotal>, AppError>;
}
