//! License Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{License, LicenseRepository, LicenseStatus, Page, PageRequest};
use crate::shared::error::AppError;

const LICENSE_COLUMNS: &str =
    "id, serial_key, user_id, status, expires_at, activated_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct LicenseRow {
    id: i64,
    serial_key: String,
    user_id: Option<i64>,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LicenseRow> for License {
    fn from(row: LicenseRow) -> Self {
        License {
            id: row.id,
            serial_key: row.serial_key,
            user_id: row.user_id,
            status: LicenseStatus::from_db(&row.status),
            expires_at: row.expires_at,
            activated_at: row.activated_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL license repository implementation.
#[derive(Clone)]
pub struct PgLicenseRepository {
    pool: PgPool,
}

impl PgLicenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LicenseRepository for PgLicenseRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<License>, AppError> {
        let row = sqlx::query_as::<_, LicenseRow>(&format!(
            "SELECT {} FROM licenses WHERE id = $1",
            LICENSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(License::from))
    }

    async fn find_by_serial_key(&self, serial_key: &str) -> Result<Option<License>, AppError> {
        let row = sqlx::query_as::<_, LicenseRow>(&format!(
            "SELECT {} FROM licenses WHERE serial_key = $1",
            LICENSE_COLUMNS
        ))
        .bind(serial_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(License::from))
    }

    async fn serial_key_exists(&self, serial_key: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM licenses WHERE serial_key = $1)",
        )
        .bind(serial_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list(
        &self,
        status: Option<LicenseStatus>,
        page: PageRequest,
    ) -> Result<Page<License>, AppError> {
        let status = status.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM licenses WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LicenseRow>(&format!(
            r#"
            SELECT {} FROM licenses
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            LICENSE_COLUMNS
        ))
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(License::from).collect(),
            total,
            page,
        ))
    }

    async fn create(&self, license: &License) -> Result<License, AppError> {
        let row = sqlx::query_as::<_, LicenseRow>(&format!(
            r#"
            INSERT INTO licenses (id, serial_key, user_id, status, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            LICENSE_COLUMNS
        ))
        .bind(license.id)
        .bind(&license.serial_key)
        .bind(license.user_id)
        .bind(license.status.as_str())
        .bind(license.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "Serial key already exists"))?;

        Ok(row.into())
    }

    async fn activate(&self, id: i64, user_id: i64) -> Result<Option<License>, AppError> {
        // The status guard makes concurrent activations race on the row lock;
        // the loser sees zero rows.
        let row = sqlx::query_as::<_, LicenseRow>(&format!(
            r#"
            UPDATE licenses
            SET user_id = $2, status = 'active', activated_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'available'
            RETURNING {}
            "#,
            LICENSE_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(License::from))
    }

    async fn revoke(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE licenses SET status = 'revoked', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("License not found".into()));
        }
        Ok(())
    }
}
