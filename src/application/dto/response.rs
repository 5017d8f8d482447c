//! Response DTOs
//!
//! Data structures for API response bodies. Snowflake IDs are rendered as
//! strings and money as decimal strings.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::application::services::{AuthTokens, Dashboard, LicenseCheck, PlacedBooking};
use crate::domain::{
    Affiliate, AffiliateStats, AffiliateStatus, Booking, BookingStatus, Commission,
    CommissionStatus, CommissionTotal, License, LicenseStatus, Page, PageMeta, PlatformCounts,
    Service, Therapist, TimeSlot, User, UserRole,
};

fn id_opt(id: Option<i64>) -> Option<String> {
    id.map(|id| id.to_string())
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn hh_mm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// A page of list results
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Paginated<T> {
    pub fn from_page<E>(page: Page<E>, f: impl FnMut(E) -> T) -> Self {
        let pagination = page.meta();
        Self {
            data: page.items.into_iter().map(f).collect(),
            pagination,
        }
    }
}

// ---- auth ----

/// Authentication tokens response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// Register / login response (user and tokens)
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

impl AuthResponse {
    pub fn new(user: User, tokens: AuthTokens) -> Self {
        Self {
            user: user.into(),
            tokens: tokens.into(),
        }
    }
}

// ---- users ----

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role: user.role,
            is_active: user.is_active,
            created_at: rfc3339(user.created_at),
            updated_at: rfc3339(user.updated_at),
        }
    }
}

// ---- affiliates ----

#[derive(Debug, Serialize)]
pub struct AffiliateResponse {
    pub id: String,
    pub user_id: String,
    pub referral_code: String,
    pub commission_rate: Decimal,
    pub status: AffiliateStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Affiliate> for AffiliateResponse {
    fn from(affiliate: Affiliate) -> Self {
        Self {
            id: affiliate.id.to_string(),
            user_id: affiliate.user_id.to_string(),
            referral_code: affiliate.referral_code,
            commission_rate: affiliate.commission_rate,
            status: affiliate.status,
            created_at: rfc3339(affiliate.created_at),
            updated_at: rfc3339(affiliate.updated_at),
        }
    }
}

/// Affiliate with its booking and commission figures
#[derive(Debug, Serialize)]
pub struct AffiliateDetailResponse {
    #[serde(flatten)]
    pub affiliate: AffiliateResponse,
    pub stats: AffiliateStats,
}

impl AffiliateDetailResponse {
    pub fn new(affiliate: Affiliate, stats: AffiliateStats) -> Self {
        Self {
            affiliate: affiliate.into(),
            stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReferralCodeResponse {
    pub valid: bool,
    pub referral_code: String,
}

// ---- therapists ----

#[derive(Debug, Serialize)]
pub struct TherapistResponse {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub specialization: String,
    pub bio: Option<String>,
    pub license_number: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Therapist> for TherapistResponse {
    fn from(therapist: Therapist) -> Self {
        Self {
            id: therapist.id.to_string(),
            user_id: therapist.user_id.to_string(),
            full_name: therapist.full_name,
            specialization: therapist.specialization,
            bio: therapist.bio,
            license_number: therapist.license_number,
            is_active: therapist.is_active,
            created_at: rfc3339(therapist.created_at),
            updated_at: rfc3339(therapist.updated_at),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SlotResponse {
    pub start_time: String,
    pub end_time: String,
}

impl From<TimeSlot> for SlotResponse {
    fn from(slot: TimeSlot) -> Self {
        Self {
            start_time: hh_mm(slot.start),
            end_time: hh_mm(slot.end),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub therapist_id: String,
    pub date: chrono::NaiveDate,
    pub booked_slots: Vec<SlotResponse>,
}

// ---- services ----

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: String,
    pub therapist_id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: service.id.to_string(),
            therapist_id: service.therapist_id.to_string(),
            name: service.name,
            description: service.description,
            duration_minutes: service.duration_minutes,
            price: service.price,
            is_active: service.is_active,
            created_at: rfc3339(service.created_at),
            updated_at: rfc3339(service.updated_at),
        }
    }
}

// ---- bookings ----

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub service_id: String,
    pub therapist_id: String,
    pub affiliate_id: Option<String>,
    pub client_user_id: Option<String>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub booking_date: chrono::NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            service_id: booking.service_id.to_string(),
            therapist_id: booking.therapist_id.to_string(),
            affiliate_id: id_opt(booking.affiliate_id),
            client_user_id: id_opt(booking.client_user_id),
            client_name: booking.client_name,
            client_email: booking.client_email,
            client_phone: booking.client_phone,
            booking_date: booking.booking_date,
            start_time: hh_mm(booking.start_time),
            end_time: hh_mm(booking.end_time),
            status: booking.status,
            total_amount: booking.total_amount,
            notes: booking.notes,
            created_at: rfc3339(booking.created_at),
            updated_at: rfc3339(booking.updated_at),
        }
    }
}

/// A new booking and the commission it generated
#[derive(Debug, Serialize)]
pub struct PlacedBookingResponse {
    pub booking: BookingResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<CommissionResponse>,
}

impl From<PlacedBooking> for PlacedBookingResponse {
    fn from(placed: PlacedBooking) -> Self {
        Self {
            booking: placed.booking.into(),
            commission: placed.commission.map(Into::into),
        }
    }
}

// ---- commissions ----

#[derive(Debug, Serialize)]
pub struct CommissionResponse {
    pub id: String,
    pub affiliate_id: String,
    pub booking_id: String,
    pub amount: Decimal,
    pub rate: Decimal,
    pub status: CommissionStatus,
    pub paid_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Commission> for CommissionResponse {
    fn from(commission: Commission) -> Self {
        Self {
            id: commission.id.to_string(),
            affiliate_id: commission.affiliate_id.to_string(),
            booking_id: commission.booking_id.to_string(),
            amount: commission.amount,
            rate: commission.rate,
            status: commission.status,
            paid_at: commission.paid_at.map(rfc3339),
            created_at: rfc3339(commission.created_at),
            updated_at: rfc3339(commission.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommissionSummaryResponse {
    pub totals: Vec<CommissionTotal>,
    pub total_count: i64,
    pub total_amount: Decimal,
}

impl From<Vec<CommissionTotal>> for CommissionSummaryResponse {
    fn from(totals: Vec<CommissionTotal>) -> Self {
        let total_count = totals.iter().map(|t| t.count).sum();
        let total_amount = totals.iter().map(|t| t.amount).sum();
        Self {
            totals,
            total_count,
            total_amount,
        }
    }
}

// ---- licenses ----

#[derive(Debug, Serialize)]
pub struct LicenseResponse {
    pub id: String,
    pub serial_key: String,
    pub user_id: Option<String>,
    pub status: LicenseStatus,
    pub expires_at: Option<String>,
    pub activated_at: Option<String>,
    pub created_at: String,
}

impl From<License> for LicenseResponse {
    fn from(license: License) -> Self {
        Self {
            id: license.id.to_string(),
            serial_key: license.serial_key,
            user_id: id_opt(license.user_id),
            status: license.status,
            expires_at: license.expires_at.map(rfc3339),
            activated_at: license.activated_at.map(rfc3339),
            created_at: rfc3339(license.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LicenseValidationResponse {
    pub valid: bool,
    pub status: Option<LicenseStatus>,
    pub expires_at: Option<String>,
}

impl From<LicenseCheck> for LicenseValidationResponse {
    fn from(check: LicenseCheck) -> Self {
        Self {
            valid: check.valid,
            status: check.status,
            expires_at: check.expires_at.map(rfc3339),
        }
    }
}

// ---- dashboard ----

#[derive(Debug, Serialize, PartialEq)]
pub struct BookingStatsResponse {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub completed: i64,
    pub completed_revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PlatformResponse {
    pub users: i64,
    pub therapists: i64,
    pub affiliates: i64,
}

impl From<PlatformCounts> for PlatformResponse {
    fn from(counts: PlatformCounts) -> Self {
        Self {
            users: counts.users,
            therapists: counts.therapists,
            affiliates: counts.affiliates,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformResponse>,
    pub bookings: BookingStatsResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commissions: Option<CommissionSummaryResponse>,
}

impl From<Dashboard> for DashboardResponse {
    fn from(dashboard: Dashboard) -> Self {
        let b = &dashboard.bookings;
        let bookings = BookingStatsResponse {
            total: b.total(),
            pending: b.count(BookingStatus::Pending),
            confirmed: b.count(BookingStatus::Confirmed),
            cancelled: b.count(BookingStatus::Cancelled),
            completed: b.count(BookingStatus::Completed),
            completed_revenue: b.completed_revenue,
        };

        Self {
            role: dashboard.role,
            platform: dashboard.platform.map(Into::into),
            bookings,
            commissions: dashboard.commissions.map(Into::into),
        }
    }
}
