//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **TimeSlot**: Half-open appointment interval with overlap detection
//! - **PageRequest / Page**: Offset pagination arithmetic
//! - **codes**: Referral code and license serial key generation

pub mod codes;
mod pagination;
mod time_slot;

pub use pagination::*;
pub use time_slot::*;
