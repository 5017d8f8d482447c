//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally
//! belong to a single entity.
//!
//! ## Services
//!
//! - **access_policy**: Who may read or change which records
//! - **commission_policy**: Commission arithmetic and status follow-up

pub mod access_policy;
pub mod commission_policy;

pub use access_policy::{Actor, BookingViewer};
