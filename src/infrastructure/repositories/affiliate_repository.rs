//! Affiliate Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{
    Affiliate, AffiliateRepository, AffiliateStats, AffiliateStatus, Page, PageRequest, UserRole,
};
use crate::shared::error::AppError;

use super::user_repository::promote;

pub(crate) const AFFILIATE_COLUMNS: &str =
    "id, user_id, referral_code, commission_rate, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AffiliateRow {
    id: i64,
    user_id: i64,
    referral_code: String,
    commission_rate: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AffiliateRow> for Affiliate {
    fn from(row: AffiliateRow) -> Self {
        Affiliate {
            id: row.id,
            user_id: row.user_id,
            referral_code: row.referral_code,
            commission_rate: row.commission_rate,
            status: AffiliateStatus::from_db(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_bookings: i64,
    pending_commission: Decimal,
    approved_commission: Decimal,
    paid_commission: Decimal,
}

/// PostgreSQL affiliate repository implementation.
#[derive(Clone)]
pub struct PgAffiliateRepository {
    pool: PgPool,
}

impl PgAffiliateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AffiliateRepository for PgAffiliateRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Affiliate>, AppError> {
        let row = sqlx::query_as::<_, AffiliateRow>(&format!(
            "SELECT {} FROM affiliates WHERE id = $1",
            AFFILIATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Affiliate::from))
    }

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Affiliate>, AppError> {
        let row = sqlx::query_as::<_, AffiliateRow>(&format!(
            "SELECT {} FROM affiliates WHERE user_id = $1",
            AFFILIATE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Affiliate::from))
    }

    async fn find_by_code(&self, referral_code: &str) -> Result<Option<Affiliate>, AppError> {
        let row = sqlx::query_as::<_, AffiliateRow>(&format!(
            "SELECT {} FROM affiliates WHERE referral_code = $1",
            AFFILIATE_COLUMNS
        ))
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Affiliate::from))
    }

    async fn code_exists(&self, referral_code: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM affiliates WHERE referral_code = $1)",
        )
        .bind(referral_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list(
        &self,
        status: Option<AffiliateStatus>,
        page: PageRequest,
    ) -> Result<Page<Affiliate>, AppError> {
        let status = status.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM affiliates WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, AffiliateRow>(&format!(
            r#"
            SELECT {} FROM affiliates
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            AFFILIATE_COLUMNS
        ))
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Affiliate::from).collect(),
            total,
            page,
        ))
    }

    async fn create(
        &self,
        affiliate: &Affiliate,
        promote_user: bool,
    ) -> Result<Affiliate, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AffiliateRow>(&format!(
            r#"
            INSERT INTO affiliates (id, user_id, referral_code, commission_rate, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            AFFILIATE_COLUMNS
        ))
        .bind(affiliate.id)
        .bind(affiliate.user_id)
        .bind(&affiliate.referral_code)
        .bind(affiliate.commission_rate)
        .bind(affiliate.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "User is already an affiliate"))?;

        if promote_user {
            promote(&mut tx, affiliate.user_id, UserRole::Affiliate).await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn update(&self, affiliate: &Affiliate) -> Result<Affiliate, AppError> {
        let row = sqlx::query_as::<_, AffiliateRow>(&format!(
            r#"
            UPDATE affiliates
            SET commission_rate = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            AFFILIATE_COLUMNS
        ))
        .bind(affiliate.id)
        .bind(affiliate.commission_rate)
        .bind(affiliate.status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Affiliate not found".into()))?;

        Ok(row.into())
    }

    async fn stats(&self, affiliate_id: i64) -> Result<AffiliateStats, AppError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM bookings WHERE affiliate_id = $1) AS total_bookings,
                COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0) AS pending_commission,
                COALESCE(SUM(amount) FILTER (WHERE status = 'approved'), 0) AS approved_commission,
                COALESCE(SUM(amount) FILTER (WHERE status = 'paid'), 0) AS paid_commission
            FROM commissions
            WHERE affiliate_id = $1
            "#,
        )
        .bind(affiliate_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AffiliateStats {
            total_bookings: row.total_bookings,
            pending_commission: row.pending_commission,
            approved_commission: row.approved_commission,
            paid_commission: row.paid_commission,
        })
    }
}
