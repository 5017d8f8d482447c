//! Therapist Repository Implementation
//!
//! Therapist rows are always read joined with `users` for the display name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::user_repository::{escape_like, promote};
use crate::domain::{
    Page, PageRequest, Therapist, TherapistFilter, TherapistRepository, UserRole,
};
use crate::shared::error::AppError;

const THERAPIST_SELECT: &str = r#"
    SELECT t.id, t.user_id, u.full_name, t.specialization, t.bio, t.license_number,
           t.is_active, t.created_at, t.updated_at
    FROM therapists t
    JOIN users u ON u.id = t.user_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct TherapistRow {
    id: i64,
    user_id: i64,
    full_name: String,
    specialization: String,
    bio: Option<String>,
    license_number: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TherapistRow> for Therapist {
    fn from(row: TherapistRow) -> Self {
        Therapist {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            specialization: row.specialization,
            bio: row.bio,
            license_number: row.license_number,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TherapistFilter) {
    qb.push(" WHERE TRUE");
    if !filter.include_inactive {
        qb.push(" AND t.is_active");
    }
    if let Some(spec) = filter
        .specialization
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        qb.push(" AND t.specialization ILIKE ")
            .push_bind(format!("%{}%", escape_like(spec)));
    }
}

/// PostgreSQL therapist repository implementation.
#[derive(Clone)]
pub struct PgTherapistRepository {
    pool: PgPool,
}

impl PgTherapistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_by(&self, condition: &str, id: i64) -> Result<Option<Therapist>, AppError> {
        let row = sqlx::query_as::<_, TherapistRow>(&format!("{} WHERE {}", THERAPIST_SELECT, condition))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Therapist::from))
    }
}

#[async_trait]
impl TherapistRepository for PgTherapistRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Therapist>, AppError> {
        self.fetch_by("t.id = $1", id).await
    }

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Therapist>, AppError> {
        self.fetch_by("t.user_id = $1", user_id).await
    }

    async fn list(
        &self,
        filter: &TherapistFilter,
        page: PageRequest,
    ) -> Result<Page<Therapist>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM therapists t");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(THERAPIST_SELECT);
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY u.full_name, t.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build_query_as::<TherapistRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(Therapist::from).collect(),
            total,
            page,
        ))
    }

    async fn create(
        &self,
        therapist: &Therapist,
        promote_user: bool,
    ) -> Result<Therapist, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO therapists (id, user_id, specialization, bio, license_number, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(therapist.id)
        .bind(therapist.user_id)
        .bind(&therapist.specialization)
        .bind(&therapist.bio)
        .bind(&therapist.license_number)
        .bind(therapist.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "User is already a therapist"))?;

        if promote_user {
            promote(&mut tx, therapist.user_id, UserRole::Therapist).await?;
        }

        tx.commit().await?;

        self.find_by_id(therapist.id)
            .await?
            .ok_or_else(|| AppError::Internal("Therapist vanished after insert".into()))
    }

    async fn update(&self, therapist: &Therapist) -> Result<Therapist, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE therapists
            SET specialization = $2, bio = $3, license_number = $4, is_active = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(therapist.id)
        .bind(&therapist.specialization)
        .bind(&therapist.bio)
        .bind(&therapist.license_number)
        .bind(therapist.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Therapist not found".into()));
        }

        self.find_by_id(therapist.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Therapist not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_listing_hides_inactive() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM therapists t");
        push_filters(&mut qb, &TherapistFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM therapists t WHERE TRUE AND t.is_active");
    }

    #[test]
    fn test_specialization_filter() {
        let filter = TherapistFilter {
            specialization: Some("massage".into()),
            include_inactive: true,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM therapists t");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM therapists t WHERE TRUE AND t.specialization ILIKE $1"
        );
    }
}
