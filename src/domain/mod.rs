//! # Domain Layer
//!
//! The domain layer contains the core business rules of the booking server.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (User, Therapist, Booking, Commission, etc.)
//! - **value_objects**: Immutable value types (TimeSlot, pagination, codes)
//! - **services**: Access and commission rules
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate domain behavior

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use services::{Actor, BookingViewer};
pub use value_objects::*;
