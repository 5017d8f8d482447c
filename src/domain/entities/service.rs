//! Bookable service entity and repository trait.
//!
//! Maps to the `services` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest};
use crate::shared::error::AppError;

pub const MIN_SERVICE_MINUTES: i32 = 5;
pub const MAX_SERVICE_MINUTES: i32 = 480;

/// Something a therapist offers, with a fixed length and price.
///
/// Maps to the `services` table:
/// - id: BIGINT PRIMARY KEY
/// - therapist_id: BIGINT NOT NULL REFERENCES therapists(id)
/// - name: VARCHAR(100) NOT NULL
/// - description: TEXT NULL
/// - duration_minutes: INTEGER NOT NULL CHECK (5..=480)
/// - price: NUMERIC(10,2) NOT NULL CHECK (>= 0)
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub therapist_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Service>, AppError>;

    /// Active services, optionally restricted to one therapist.
    async fn list_active(
        &self,
        therapist_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Service>, AppError>;

    async fn create(&self, service: &Service) -> Result<Service, AppError>;

    async fn update(&self, service: &Service) -> Result<Service, AppError>;
}
