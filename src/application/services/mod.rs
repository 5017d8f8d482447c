//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, token refresh, password changes
//! - **UserService**: Account administration
//! - **AffiliateService**: Affiliate enrollment and referral codes
//! - **TherapistService**: Therapist profiles
//! - **CatalogService**: Bookable services
//! - **BookingService**: Booking placement and status workflow
//! - **CommissionService**: Commission ledgers and payouts
//! - **LicenseService**: Serial-key licenses
//! - **DashboardService**: Role-scoped summaries

pub mod affiliate_service;
pub mod auth_service;
pub mod booking_service;
pub mod catalog_service;
pub mod commission_service;
pub mod dashboard_service;
pub mod license_service;
pub mod therapist_service;
pub mod user_service;

pub use affiliate_service::{
    AffiliateError, AffiliateService, AffiliateServiceImpl, AffiliateUpdate, NewAffiliate,
};
pub use auth_service::{
    AuthError, AuthService, AuthServiceImpl, AuthTokens, Claims, NewAccount, TokenCodec,
};
pub use booking_service::{
    BookingError, BookingService, BookingServiceImpl, NewBooking, PlacedBooking,
};
pub use catalog_service::{
    CatalogError, CatalogService, CatalogServiceImpl, NewService, ServiceUpdate,
};
pub use commission_service::{CommissionError, CommissionService, CommissionServiceImpl};
pub use dashboard_service::{Dashboard, DashboardService, DashboardServiceImpl};
pub use license_service::{
    LicenseCheck, LicenseError, LicenseService, LicenseServiceImpl, MAX_ISSUE_QUANTITY,
};
pub use therapist_service::{
    NewTherapist, TherapistError, TherapistService, TherapistServiceImpl, TherapistUpdate,
};
pub use user_service::{UserError, UserService, UserServiceImpl, UserUpdate};
