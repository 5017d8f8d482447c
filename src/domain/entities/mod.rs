//! # Domain Entities
//!
//! Core domain entities representing the main business objects.
//! All entities map directly to their corresponding database tables.
//!
//! ## Core Entities
//!
//! - **User**: Account with credentials and a role
//! - **Therapist**: Service provider profile linked to a user
//! - **Service**: Bookable offering of a therapist (duration + price)
//! - **Booking**: Appointment for a service, optionally referred by an affiliate
//! - **Affiliate**: Referrer profile with a referral code and commission rate
//! - **Commission**: Payout owed to an affiliate for one booking
//!
//! ## Supporting Entities
//!
//! - **Session**: Refresh token sessions
//! - **License**: Serial-key licenses bound to users
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod affiliate;
mod booking;
mod commission;
mod dashboard;
mod license;
mod service;
mod session;
mod therapist;
mod user;

pub use affiliate::{Affiliate, AffiliateRepository, AffiliateStats, AffiliateStatus};
pub use booking::{
    Booking, BookingFilter, BookingRepository, BookingStatus, BookingTransaction, BookingVisibility,
};
pub use commission::{
    Commission, CommissionFilter, CommissionRepository, CommissionStatus, CommissionTotal,
};
pub use dashboard::{BookingBreakdown, BookingScope, DashboardRepository, PlatformCounts};
pub use license::{License, LicenseRepository, LicenseStatus};
pub use service::{Service, ServiceRepository, MAX_SERVICE_MINUTES, MIN_SERVICE_MINUTES};
pub use session::{Session, SessionRepository};
pub use therapist::{Therapist, TherapistFilter, TherapistRepository};
pub use user::{User, UserFilter, UserRepository, UserRole};

#[cfg(test)]
pub use affiliate::MockAffiliateRepository;
#[cfg(test)]
pub use commission::MockCommissionRepository;
#[cfg(test)]
pub use dashboard::MockDashboardRepository;
#[cfg(test)]
pub use license::MockLicenseRepository;
#[cfg(test)]
pub use service::MockServiceRepository;
#[cfg(test)]
pub use session::MockSessionRepository;
#[cfg(test)]
pub use therapist::MockTherapistRepository;
#[cfg(test)]
pub use user::MockUserRepository;
