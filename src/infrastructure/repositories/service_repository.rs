//! Service Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{Page, PageRequest, Service, ServiceRepository};
use crate::shared::error::AppError;

pub(crate) const SERVICE_COLUMNS: &str =
    "id, therapist_id, name, description, duration_minutes, price, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ServiceRow {
    id: i64,
    therapist_id: i64,
    name: String,
    description: Option<String>,
    duration_minutes: i32,
    price: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            therapist_id: row.therapist_id,
            name: row.name,
            description: row.description,
            duration_minutes: row.duration_minutes,
            price: row.price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL service repository implementation.
#[derive(Clone)]
pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Service>, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {} FROM services WHERE id = $1",
            SERVICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Service::from))
    }

    async fn list_active(
        &self,
        therapist_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Service>, AppError> {
        // Services of a deactivated therapist are not bookable either
        let condition = r#"
            s.is_active
            AND EXISTS (SELECT 1 FROM therapists t WHERE t.id = s.therapist_id AND t.is_active)
            AND ($1::bigint IS NULL OR s.therapist_id = $1)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM services s WHERE {}",
            condition
        ))
        .bind(therapist_id)
        .fetch_one(&self.pool)
        .await?;

        let columns = SERVICE_COLUMNS
            .split(", ")
            .map(|c| format!("s.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {} FROM services s WHERE {} ORDER BY s.name, s.id LIMIT $2 OFFSET $3",
            columns, condition
        ))
        .bind(therapist_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Service::from).collect(),
            total,
            page,
        ))
    }

    async fn create(&self, service: &Service) -> Result<Service, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            INSERT INTO services (id, therapist_id, name, description, duration_minutes, price, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        ))
        .bind(service.id)
        .bind(service.therapist_id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.duration_minutes)
        .bind(service.price)
        .bind(service.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, service: &Service) -> Result<Service, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            UPDATE services
            SET name = $2, description = $3, duration_minutes = $4, price = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        ))
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.duration_minutes)
        .bind(service.price)
        .bind(service.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Service not found".into()))?;

        Ok(row.into())
    }
}
