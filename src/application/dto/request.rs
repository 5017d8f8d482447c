//! Request DTOs
//!
//! Data structures for API request bodies and query strings.
//! IDs arrive as strings and are parsed in the handlers.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::{
    AffiliateStatus, BookingStatus, CommissionStatus, LicenseStatus, UserRole,
};
use crate::shared::error::AppError;
use crate::shared::validation::not_blank;

fn percentage(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("range")
            .with_message("Commission rate must be between 0 and 100".into()));
    }
    if rate.normalize().scale() > 2 {
        return Err(ValidationError::new("scale")
            .with_message("Commission rate must have at most two decimal places".into()));
    }
    Ok(())
}

/// Largest value a `NUMERIC(10,2)` column holds
const MAX_PRICE: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

fn price(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO || *amount > MAX_PRICE {
        return Err(ValidationError::new("range")
            .with_message("Price must be between 0 and 99999999.99".into()));
    }
    if amount.normalize().scale() > 2 {
        return Err(ValidationError::new("scale")
            .with_message("Price must have at most two decimal places".into()));
    }
    Ok(())
}

// ---- auth ----

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(
        length(max = 100, message = "Full name must be 1-100 characters"),
        custom(function = "not_blank", message = "Full name must be 1-100 characters")
    )]
    pub full_name: String,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh / logout request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

// ---- users ----

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(max = 100, message = "Full name must be 1-100 characters"),
        custom(function = "not_blank", message = "Full name must be 1-100 characters")
    )]
    pub full_name: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    pub role: Option<UserRole>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<UserRole>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

// ---- affiliates ----

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateAffiliateRequest {
    pub user_id: Option<String>,

    #[validate(custom(function = "percentage"))]
    pub commission_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAffiliateRequest {
    #[validate(custom(function = "percentage"))]
    pub commission_rate: Option<Decimal>,

    pub status: Option<AffiliateStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AffiliateListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<AffiliateStatus>,
}

// ---- therapists ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTherapistRequest {
    pub user_id: String,

    #[validate(
        length(max = 100, message = "Specialization must be 1-100 characters"),
        custom(function = "not_blank", message = "Specialization must be 1-100 characters")
    )]
    pub specialization: String,

    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 64, message = "License number must be at most 64 characters"))]
    pub license_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTherapistRequest {
    #[validate(
        length(max = 100, message = "Specialization must be 1-100 characters"),
        custom(function = "not_blank", message = "Specialization must be 1-100 characters")
    )]
    pub specialization: Option<String>,

    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 64, message = "License number must be at most 64 characters"))]
    pub license_number: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TherapistListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub specialization: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// ---- services ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    pub therapist_id: Option<String>,

    #[validate(
        length(max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank", message = "Name must be 1-100 characters")
    )]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 5, max = 480, message = "Duration must be 5-480 minutes"))]
    pub duration_minutes: i32,

    #[validate(custom(function = "price"))]
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(
        length(max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank", message = "Name must be 1-100 characters")
    )]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 5, max = 480, message = "Duration must be 5-480 minutes"))]
    pub duration_minutes: Option<i32>,

    #[validate(custom(function = "self::price"))]
    pub price: Option<Decimal>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub therapist_id: Option<String>,
}

// ---- bookings ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub service_id: String,

    pub booking_date: NaiveDate,

    /// "HH:MM", seconds optional
    pub start_time: String,

    #[validate(
        length(max = 100, message = "Client name must be 1-100 characters"),
        custom(function = "not_blank", message = "Client name must be 1-100 characters")
    )]
    pub client_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub client_email: String,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub client_phone: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,

    pub affiliate_code: Option<String>,
}

impl CreateBookingRequest {
    pub fn parse_start_time(&self) -> Result<NaiveTime, AppError> {
        parse_start_time(&self.start_time)
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_start_time(raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::invalid_field("start_time", "Start time must be HH:MM"))
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<BookingStatus>,
    pub therapist_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

// ---- commissions ----

#[derive(Debug, Default, Deserialize)]
pub struct CommissionListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<CommissionStatus>,
    pub affiliate_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommissionStatusRequest {
    pub status: CommissionStatus,
}

// ---- licenses ----

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueLicensesRequest {
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 50, message = "Quantity must be between 1 and 50"))]
    pub quantity: u32,

    #[validate(range(min = 1, max = 36500, message = "Expiry must be between 1 and 36500 days"))]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LicenseListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<LicenseStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ActivateLicenseRequest {
    #[validate(length(min = 1, message = "Serial key is required"))]
    pub serial_key: String,
}
