//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Accounts, roles and credentials
//! - **SessionRepository** - Refresh token sessions
//! - **AffiliateRepository** - Referral profiles and earnings stats
//! - **TherapistRepository** - Provider profiles (joined with users)
//! - **ServiceRepository** - Bookable services
//! - **BookingRepository** - Booking reads plus the placement transaction
//! - **CommissionRepository** - Commission listing and status changes
//! - **LicenseRepository** - Serial-key licenses
//! - **DashboardRepository** - Aggregate counts
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgBookingRepository, PgUserRepository};
//!
//! fn setup_repositories(pool: PgPool) {
//!     let users = PgUserRepository::new(pool.clone());
//!     let bookings = PgBookingRepository::new(pool);
//! }
//! ```

pub mod affiliate_repository;
pub mod booking_repository;
pub mod commission_repository;
pub mod dashboard_repository;
pub mod license_repository;
pub mod service_repository;
pub mod session_repository;
pub mod therapist_repository;
pub mod user_repository;

pub use affiliate_repository::PgAffiliateRepository;
pub use booking_repository::{PgBookingRepository, PgBookingTx};
pub use commission_repository::PgCommissionRepository;
pub use dashboard_repository::PgDashboardRepository;
pub use license_repository::PgLicenseRepository;
pub use service_repository::PgServiceRepository;
pub use session_repository::PgSessionRepository;
pub use therapist_repository::PgTherapistRepository;
pub use user_repository::PgUserRepository;
