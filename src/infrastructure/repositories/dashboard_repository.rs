//! Dashboard aggregate queries.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::commission_repository::fetch_totals;
use crate::domain::{
    BookingBreakdown, BookingScope, BookingStatus, CommissionTotal, DashboardRepository,
    PlatformCounts,
};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    users: i64,
    therapists: i64,
    affiliates: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    status: String,
    count: i64,
    revenue: Decimal,
}

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: BookingScope) {
    match scope {
        BookingScope::All => {}
        BookingScope::Therapist(id) => {
            qb.push(" WHERE therapist_id = ").push_bind(id);
        }
        BookingScope::Affiliate(id) => {
            qb.push(" WHERE affiliate_id = ").push_bind(id);
        }
        BookingScope::Client(id) => {
            qb.push(" WHERE client_user_id = ").push_bind(id);
        }
    }
}

fn breakdown_from_rows(rows: Vec<StatusRow>) -> BookingBreakdown {
    let mut breakdown = BookingBreakdown::default();
    for row in rows {
        let Some(status) = BookingStatus::parse(&row.status) else {
            continue;
        };
        if status == BookingStatus::Completed {
            breakdown.completed_revenue = row.revenue;
        }
        breakdown.by_status.insert(status, row.count);
    }
    breakdown
}

/// PostgreSQL dashboard repository implementation.
#[derive(Clone)]
pub struct PgDashboardRepository {
    pool: PgPool,
}

impl PgDashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DashboardRepository for PgDashboardRepository {
    async fn platform_counts(&self) -> Result<PlatformCounts, AppError> {
        let row = sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM therapists) AS therapists,
                (SELECT COUNT(*) FROM affiliates) AS affiliates
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformCounts {
            users: row.users,
            therapists: row.therapists,
            affiliates: row.affiliates,
        })
    }

    async fn booking_breakdown(&self, scope: BookingScope) -> Result<BookingBreakdown, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS revenue FROM bookings",
        );
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY status");

        let rows = qb.build_query_as::<StatusRow>().fetch_all(&self.pool).await?;
        Ok(breakdown_from_rows(rows))
    }

    async fn commission_totals(&self, affiliate_id: Option<i64>) -> Result<Vec<CommissionTotal>, AppError> {
        fetch_totals(&self.pool, affiliate_id).await
    }
}
