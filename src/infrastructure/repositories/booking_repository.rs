//! Booking Repository Implementation
//!
//! Reads go straight to the pool. Placement and status changes run inside a
//! [`PgBookingTx`], which wraps one `sqlx` transaction and rolls back on drop.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::affiliate_repository::{AffiliateRow, AFFILIATE_COLUMNS};
use super::commission_repository::{CommissionRow, COMMISSION_COLUMNS};
use super::service_repository::ServiceRow;
use crate::domain::{
    Affiliate, Booking, BookingFilter, BookingRepository, BookingStatus, BookingTransaction,
    Commission, CommissionStatus, Page, PageRequest, Service, TimeSlot,
};
use crate::shared::error::AppError;

const BOOKING_COLUMNS: &str = "id, service_id, therapist_id, affiliate_id, client_user_id, \
     client_name, client_email, client_phone, booking_date, start_time, end_time, status, \
     total_amount, notes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: i64,
    service_id: i64,
    therapist_id: i64,
    affiliate_id: Option<i64>,
    client_user_id: Option<i64>,
    client_name: String,
    client_email: String,
    client_phone: Option<String>,
    booking_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: String,
    total_amount: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            service_id: row.service_id,
            therapist_id: row.therapist_id,
            affiliate_id: row.affiliate_id,
            client_user_id: row.client_user_id,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            booking_date: row.booking_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: BookingStatus::from_db(&row.status),
            total_amount: row.total_amount,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    start_time: NaiveTime,
    end_time: NaiveTime,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(therapist_id) = filter.therapist_id {
        qb.push(" AND therapist_id = ").push_bind(therapist_id);
    }
    if let Some(affiliate_id) = filter.affiliate_id {
        qb.push(" AND affiliate_id = ").push_bind(affiliate_id);
    }
    if let Some(client_user_id) = filter.client_user_id {
        qb.push(" AND client_user_id = ").push_bind(client_user_id);
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND booking_date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND booking_date <= ").push_bind(to);
    }
    if let Some(visible) = filter.visible_to {
        qb.push(" AND (client_user_id = ").push_bind(visible.client_user_id);
        if let Some(therapist_id) = visible.therapist_id {
            qb.push(" OR therapist_id = ").push_bind(therapist_id);
        }
        if let Some(affiliate_id) = visible.affiliate_id {
            qb.push(" OR affiliate_id = ").push_bind(affiliate_id);
        }
        qb.push(")");
    }
}

/// PostgreSQL booking repository implementation.
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    type Tx = PgBookingTx;

    async fn begin(&self) -> Result<PgBookingTx, AppError> {
        let tx = self.pool.begin().await?;
        Ok(PgBookingTx { tx })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> Result<Page<Booking>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM bookings", BOOKING_COLUMNS));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY booking_date DESC, start_time DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(Booking::from).collect(),
            total,
            page,
        ))
    }

    async fn occupied_slots(
        &self,
        therapist_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, AppError> {
        let rows = sqlx::query_as::<_, SlotRow>(
            r#"
            SELECT start_time, end_time FROM bookings
            WHERE therapist_id = $1 AND booking_date = $2
              AND status IN ('pending', 'confirmed')
            ORDER BY start_time
            "#,
        )
        .bind(therapist_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TimeSlot {
                start: r.start_time,
                end: r.end_time,
            })
            .collect())
    }
}

/// One open booking transaction.
pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTransaction for PgBookingTx {
    async fn lock_active_service(&mut self, service_id: i64) -> Result<Option<Service>, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT s.id, s.therapist_id, s.name, s.description, s.duration_minutes, s.price,
                   s.is_active, s.created_at, s.updated_at
            FROM services s
            JOIN therapists t ON t.id = s.therapist_id
            WHERE s.id = $1 AND s.is_active AND t.is_active
            FOR UPDATE OF t
            "#,
        )
        .bind(service_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Service::from))
    }

    async fn has_conflict(
        &mut self,
        therapist_id: i64,
        date: NaiveDate,
        slot: &TimeSlot,
    ) -> Result<bool, AppError> {
        let conflict = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE therapist_id = $1 AND booking_date = $2
                  AND status IN ('pending', 'confirmed')
                  AND start_time < $4 AND $3 < end_time
            )
            "#,
        )
        .bind(therapist_id)
        .bind(date)
        .bind(slot.start)
        .bind(slot.end)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(conflict)
    }

    async fn find_active_affiliate(&mut self, referral_code: &str) -> Result<Option<Affiliate>, AppError> {
        let row = sqlx::query_as::<_, AffiliateRow>(&format!(
            "SELECT {} FROM affiliates WHERE referral_code = $1 AND status = 'active'",
            AFFILIATE_COLUMNS
        ))
        .bind(referral_code)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Affiliate::from))
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<Booking, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (id, service_id, therapist_id, affiliate_id, client_user_id,
                                  client_name, client_email, client_phone, booking_date,
                                  start_time, end_time, status, total_amount, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.id)
        .bind(booking.service_id)
        .bind(booking.therapist_id)
        .bind(booking.affiliate_id)
        .bind(booking.client_user_id)
        .bind(&booking.client_name)
        .bind(&booking.client_email)
        .bind(&booking.client_phone)
        .bind(booking.booking_date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.status.as_str())
        .bind(booking.total_amount)
        .bind(&booking.notes)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn insert_commission(&mut self, commission: &Commission) -> Result<Commission, AppError> {
        let row = sqlx::query_as::<_, CommissionRow>(&format!(
            r#"
            INSERT INTO commissions (id, affiliate_id, booking_id, amount, rate, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COMMISSION_COLUMNS
        ))
        .bind(commission.id)
        .bind(commission.affiliate_id)
        .bind(commission.booking_id)
        .bind(commission.amount)
        .bind(commission.rate)
        .bind(commission.status.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, "Booking already has a commission"))?;

        Ok(row.into())
    }

    async fn lock_booking(&mut self, id: i64) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn set_booking_status(&mut self, id: i64, status: BookingStatus) -> Result<Booking, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

        Ok(row.into())
    }

    async fn commission_for_booking(&mut self, booking_id: i64) -> Result<Option<Commission>, AppError> {
        let row = sqlx::query_as::<_, CommissionRow>(&format!(
            "SELECT {} FROM commissions WHERE booking_id = $1 FOR UPDATE",
            COMMISSION_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Commission::from))
    }

    async fn set_commission_status(
        &mut self,
        commission_id: i64,
        status: CommissionStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Commission, AppError> {
        let row = sqlx::query_as::<_, CommissionRow>(&format!(
            r#"
            UPDATE commissions
            SET status = $2, paid_at = COALESCE($3, paid_at), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMMISSION_COLUMNS
        ))
        .bind(commission_id)
        .bind(status.as_str())
        .bind(paid_at)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Commission not found".into()))?;

        Ok(row.into())
    }

    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookingVisibility;

    #[test]
    fn test_no_filters() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filters(&mut qb, &BookingFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM bookings WHERE TRUE");
    }

    #[test]
    fn test_scoped_date_range() {
        let filter = BookingFilter {
            status: Some(BookingStatus::Confirmed),
            affiliate_id: Some(3),
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 1, 31),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM bookings WHERE TRUE AND status = $1 AND affiliate_id = $2 \
             AND booking_date >= $3 AND booking_date <= $4"
        );
    }

    #[test]
    fn test_visibility_is_one_or_group() {
        let filter = BookingFilter {
            status: Some(BookingStatus::Pending),
            visible_to: Some(BookingVisibility {
                therapist_id: Some(20),
                affiliate_id: None,
                client_user_id: 7,
            }),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM bookings WHERE TRUE AND status = $1 \
             AND (client_user_id = $2 OR therapist_id = $3)"
        );
    }
}
