//! Commission Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::{
    Commission, CommissionFilter, CommissionRepository, CommissionStatus, CommissionTotal, Page,
    PageRequest,
};
use crate::shared::error::AppError;

pub(crate) const COMMISSION_COLUMNS: &str =
    "id, affiliate_id, booking_id, amount, rate, status, paid_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CommissionRow {
    id: i64,
    affiliate_id: i64,
    booking_id: i64,
    amount: Decimal,
    rate: Decimal,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommissionRow> for Commission {
    fn from(row: CommissionRow) -> Self {
        Commission {
            id: row.id,
            affiliate_id: row.affiliate_id,
            booking_id: row.booking_id,
            amount: row.amount,
            rate: row.rate,
            status: CommissionStatus::from_db(&row.status),
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TotalRow {
    status: String,
    count: i64,
    amount: Decimal,
}

impl From<TotalRow> for CommissionTotal {
    fn from(row: TotalRow) -> Self {
        CommissionTotal {
            status: CommissionStatus::from_db(&row.status),
            count: row.count,
            amount: row.amount,
        }
    }
}

/// Per-status totals, optionally for one affiliate.
pub(crate) async fn fetch_totals(
    pool: &PgPool,
    affiliate_id: Option<i64>,
) -> Result<Vec<CommissionTotal>, AppError> {
    let rows = sqlx::query_as::<_, TotalRow>(
        r#"
        SELECT status, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS amount
        FROM commissions
        WHERE ($1::bigint IS NULL OR affiliate_id = $1)
        GROUP BY status
        ORDER BY status
        "#,
    )
    .bind(affiliate_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CommissionTotal::from).collect())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &CommissionFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(affiliate_id) = filter.affiliate_id {
        qb.push(" AND affiliate_id = ").push_bind(affiliate_id);
    }
}

/// PostgreSQL commission repository implementation.
#[derive(Clone)]
pub struct PgCommissionRepository {
    pool: PgPool,
}

impl PgCommissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommissionRepository for PgCommissionRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Commission>, AppError> {
        let row = sqlx::query_as::<_, CommissionRow>(&format!(
            "SELECT {} FROM commissions WHERE id = $1",
            COMMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Commission::from))
    }

    async fn list(
        &self,
        filter: &CommissionFilter,
        page: PageRequest,
    ) -> Result<Page<Commission>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM commissions");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM commissions", COMMISSION_COLUMNS));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build_query_as::<CommissionRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(Commission::from).collect(),
            total,
            page,
        ))
    }

    async fn totals(&self, affiliate_id: Option<i64>) -> Result<Vec<CommissionTotal>, AppError> {
        fetch_totals(&self.pool, affiliate_id).await
    }

    async fn update_status(
        &self,
        id: i64,
        from: CommissionStatus,
        to: CommissionStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Commission>, AppError> {
        let row = sqlx::query_as::<_, CommissionRow>(&format!(
            r#"
            UPDATE commissions
            SET status = $3, paid_at = COALESCE($4, paid_at), updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            COMMISSION_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters() {
        let filter = CommissionFilter {
            status: Some(CommissionStatus::Approved),
            affiliate_id: Some(7),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM commissions");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM commissions WHERE TRUE AND status = $1 AND affiliate_id = $2"
        );
    }

    #[test]
    fn test_unknown_status_row_falls_back_to_pending() {
        let total = CommissionTotal::from(TotalRow {
            status: "weird".into(),
            count: 2,
            amount: Decimal::new(1500, 2),
        });
        assert_eq!(total.status, CommissionStatus::Pending);
        assert_eq!(total.amount, Decimal::new(1500, 2));
    }
}
