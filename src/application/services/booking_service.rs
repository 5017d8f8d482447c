//! Booking Service
//!
//! Placing bookings and moving them through their lifecycle.
//!
//! Placement runs in a single store transaction: the service row is locked,
//! the therapist's day is checked for overlapping active bookings, the
//! affiliate code is resolved, and the booking plus its commission are
//! inserted before commit. Any failure drops the transaction, which rolls
//! everything back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};

use crate::domain::codes::normalize_code;
use crate::domain::services::commission_policy::{commission_amount, follow_booking_status};
use crate::domain::{
    Actor, AffiliateRepository, Booking, BookingFilter, BookingRepository, BookingStatus,
    BookingTransaction, BookingViewer, Commission, CommissionStatus, Page, PageRequest,
    SlotError, TherapistRepository, TimeSlot, UserRole,
};
use crate::infrastructure::email::{notify, EmailTemplate, Mailer};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait BookingService: Send + Sync {
    /// Place a booking; `actor` is set when the caller is signed in
    async fn place_booking(
        &self,
        actor: Option<Actor>,
        input: NewBooking,
    ) -> Result<PlacedBooking, BookingError>;

    /// Bookings visible to the actor
    async fn list_bookings(
        &self,
        actor: Actor,
        filter: BookingFilter,
        page: PageRequest,
    ) -> Result<Page<Booking>, BookingError>;

    async fn get_booking(&self, actor: Actor, booking_id: i64) -> Result<Booking, BookingError>;

    /// Set a booking's status and update its commission accordingly
    async fn update_status(
        &self,
        actor: Actor,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<Booking, BookingError>;

    /// Slots taken by pending or confirmed bookings of a therapist on a day
    async fn availability(
        &self,
        therapist_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, BookingError>;
}

/// Booking request
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub service_id: i64,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub affiliate_code: Option<String>,
}

/// A placed booking and the commission it generated, if any
#[derive(Debug, Clone)]
pub struct PlacedBooking {
    pub booking: Booking,
    pub commission: Option<Commission>,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Therapist not found")]
    TherapistNotFound,

    #[error("Booking must start in the future")]
    InPast,

    #[error(transparent)]
    InvalidSlot(#[from] SlotError),

    #[error("Time slot is already booked")]
    SlotTaken,

    #[error("Invalid or inactive affiliate code")]
    InvalidAffiliateCode,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::NotFound => AppError::NotFound("Booking not found".into()),
            BookingError::ServiceNotFound => AppError::NotFound("Service not found".into()),
            BookingError::TherapistNotFound => AppError::NotFound("Therapist not found".into()),
            BookingError::InPast => {
                AppError::invalid_field("booking_date", "Booking must start in the future")
            }
            BookingError::InvalidSlot(e) => AppError::invalid_field("start_time", e.to_string()),
            BookingError::SlotTaken => AppError::Conflict("Time slot is already booked".into()),
            BookingError::InvalidAffiliateCode => {
                AppError::invalid_field("affiliate_code", "Invalid or inactive affiliate code")
            }
            BookingError::Forbidden(msg) => AppError::Forbidden(msg.into()),
            BookingError::Store(e) => e,
        }
    }
}

pub struct BookingServiceImpl<B, T, A>
where
    B: BookingRepository,
    T: TherapistRepository,
    A: AffiliateRepository,
{
    booking_repo: Arc<B>,
    therapist_repo: Arc<T>,
    affiliate_repo: Arc<A>,
    id_generator: Arc<SnowflakeGenerator>,
    mailer: Arc<dyn Mailer>,
}

impl<B, T, A> BookingServiceImpl<B, T, A>
where
    B: BookingRepository,
    T: TherapistRepository,
    A: AffiliateRepository,
{
    pub fn new(
        booking_repo: Arc<B>,
        therapist_repo: Arc<T>,
        affiliate_repo: Arc<A>,
        id_generator: Arc<SnowflakeGenerator>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            booking_repo,
            therapist_repo,
            affiliate_repo,
            id_generator,
            mailer,
        }
    }

    /// Look up the profiles that give the actor access to bookings
    async fn viewer(&self, actor: Actor) -> Result<BookingViewer, BookingError> {
        let therapist_id = match actor.role {
            UserRole::Therapist => self
                .therapist_repo
                .find_by_user_id(actor.user_id)
                .await?
                .map(|t| t.id),
            _ => None,
        };
        let affiliate_id = match actor.role {
            UserRole::Affiliate => self
                .affiliate_repo
                .find_by_user_id(actor.user_id)
                .await?
                .map(|a| a.id),
            _ => None,
        };

        Ok(BookingViewer {
            actor,
            therapist_id,
            affiliate_id,
        })
    }
}

#[async_trait]
impl<B, T, A> BookingService for BookingServiceImpl<B, T, A>
where
    B: BookingRepository + 'static,
    T: TherapistRepository + 'static,
    A: AffiliateRepository + 'static,
{
    async fn place_booking(
        &self,
        actor: Option<Actor>,
        input: NewBooking,
    ) -> Result<PlacedBooking, BookingError> {
        let starts_at = input.booking_date.and_time(input.start_time).and_utc();
        if starts_at <= Utc::now() {
            return Err(BookingError::InPast);
        }

        let affiliate_code = input
            .affiliate_code
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty());

        let mut tx = self.booking_repo.begin().await?;

        let service = tx
            .lock_active_service(input.service_id)
            .await?
            .ok_or(BookingError::ServiceNotFound)?;

        let slot = TimeSlot::starting_at(input.start_time, service.duration_minutes)?;

        if tx
            .has_conflict(service.therapist_id, input.booking_date, &slot)
            .await?
        {
            metrics::record_booking_conflict();
            tracing::debug!(
                therapist_id = service.therapist_id,
                date = %input.booking_date,
                start = %slot.start,
                "Booking slot conflict"
            );
            return Err(BookingError::SlotTaken);
        }

        let affiliate = match affiliate_code {
            Some(code) => Some(
                tx.find_active_affiliate(&code)
                    .await?
                    .ok_or(BookingError::InvalidAffiliateCode)?,
            ),
            None => None,
        };

        let now = Utc::now();
        let booking = tx
            .insert_booking(&Booking {
                id: self.id_generator.generate(),
                service_id: service.id,
                therapist_id: service.therapist_id,
                affiliate_id: affiliate.as_ref().map(|a| a.id),
                client_user_id: actor.map(|a| a.user_id),
                client_name: input.client_name.trim().to_string(),
                client_email: input.client_email.trim().to_lowercase(),
                client_phone: input.client_phone,
                booking_date: input.booking_date,
                start_time: slot.start,
                end_time: slot.end,
                status: BookingStatus::Pending,
                total_amount: service.price,
                notes: input.notes,
                created_at: now,
                updated_at: now,
            })
            .await?;

        let commission = match &affiliate {
            Some(affiliate) => Some(
                tx.insert_commission(&Commission {
                    id: self.id_generator.generate(),
                    affiliate_id: affiliate.id,
                    booking_id: booking.id,
                    amount: commission_amount(service.price, affiliate.commission_rate),
                    rate: affiliate.commission_rate,
                    status: CommissionStatus::Pending,
                    paid_at: None,
                    created_at: now,
                    updated_at: now,
                })
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;

        metrics::record_booking_placed(commission.is_some());
        if commission.is_some() {
            metrics::record_commission_created();
        }
        tracing::info!(
            booking_id = booking.id,
            service_id = service.id,
            therapist_id = booking.therapist_id,
            affiliate_id = ?booking.affiliate_id,
            "Booking placed"
        );

        notify(
            self.mailer.as_ref(),
            &booking.client_email,
            EmailTemplate::BookingReceived {
                client_name: booking.client_name.clone(),
                booking_id: booking.id,
                service_name: service.name.clone(),
                booking_date: booking.booking_date,
                start_time: booking.start_time,
                total_amount: booking.total_amount,
            },
        )
        .await;

        Ok(PlacedBooking {
            booking,
            commission,
        })
    }

    async fn list_bookings(
        &self,
        actor: Actor,
        filter: BookingFilter,
        page: PageRequest,
    ) -> Result<Page<Booking>, BookingError> {
        let viewer = self.viewer(actor).await?;
        Ok(self.booking_repo.list(&viewer.restrict(filter), page).await?)
    }

    async fn get_booking(&self, actor: Actor, booking_id: i64) -> Result<Booking, BookingError> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        // Out-of-scope bookings look exactly like missing ones
        if !self.viewer(actor).await?.can_view(&booking) {
            return Err(BookingError::NotFound);
        }

        Ok(booking)
    }

    async fn update_status(
        &self,
        actor: Actor,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let viewer = self.viewer(actor).await?;
        let mut tx = self.booking_repo.begin().await?;

        let current = tx
            .lock_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if !viewer.can_view(&current) {
            return Err(BookingError::NotFound);
        }
        if !viewer.can_set_status(&current, status) {
            return Err(BookingError::Forbidden(
                "You are not allowed to set this booking status",
            ));
        }

        let booking = tx.set_booking_status(booking_id, status).await?;

        if let Some(commission) = tx.commission_for_booking(booking_id).await? {
            if let Some(next) = follow_booking_status(status, commission.status) {
                tx.set_commission_status(commission.id, next, None).await?;
                tracing::debug!(
                    commission_id = commission.id,
                    from = %commission.status,
                    to = %next,
                    "Commission follows booking"
                );
            }
        }

        tx.commit().await?;

        tracing::info!(
            booking_id,
            from = %current.status,
            to = %status,
            by = actor.user_id,
            "Booking status updated"
        );

        notify(
            self.mailer.as_ref(),
            &booking.client_email,
            EmailTemplate::BookingStatusChanged {
                client_name: booking.client_name.clone(),
                booking_id: booking.id,
                booking_date: booking.booking_date,
                start_time: booking.start_time,
                status,
            },
        )
        .await;

        Ok(booking)
    }

    async fn availability(
        &self,
        therapist_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        match self.therapist_repo.find_by_id(therapist_id).await? {
            Some(therapist) if therapist.is_active => {}
            _ => return Err(BookingError::TherapistNotFound),
        }

        Ok(self.booking_repo.occupied_slots(therapist_id, date).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Affiliate, AffiliateStatus, MockAffiliateRepository, MockTherapistRepository, Service,
        Therapist,
    };
    use crate::infrastructure::email::RecordingMailer;
    use chrono::{DateTime, Duration};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    #[derive(Debug, Clone, Default)]
    struct Store {
        services: Vec<Service>,
        affiliates: Vec<Affiliate>,
        bookings: Vec<Booking>,
        commissions: Vec<Commission>,
        fail_commission_insert: bool,
    }

    /// Bookings kept in memory; a transaction works on a copy that replaces
    /// the shared store on commit.
    #[derive(Clone, Default)]
    struct InMemoryBookings {
        store: Arc<Mutex<Store>>,
    }

    struct InMemoryTx {
        shared: Arc<Mutex<Store>>,
        staged: Store,
    }

    impl InMemoryBookings {
        fn snapshot(&self) -> Store {
            self.store.lock().clone()
        }
    }

    #[async_trait]
    impl BookingRepository for InMemoryBookings {
        type Tx = InMemoryTx;

        async fn begin(&self) -> Result<InMemoryTx, AppError> {
            Ok(InMemoryTx {
                shared: self.store.clone(),
                staged: self.snapshot(),
            })
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, AppError> {
            Ok(self.snapshot().bookings.into_iter().find(|b| b.id == id))
        }

        async fn list(
            &self,
            filter: &BookingFilter,
            page: PageRequest,
        ) -> Result<Page<Booking>, AppError> {
            let items: Vec<Booking> = self
                .snapshot()
                .bookings
                .into_iter()
                .filter(|b| filter.matches(b))
                .collect();
            let total = items.len() as i64;
            Ok(Page::new(items, total, page))
        }

        async fn occupied_slots(
            &self,
            therapist_id: i64,
            date: NaiveDate,
        ) -> Result<Vec<TimeSlot>, AppError> {
            Ok(self
                .snapshot()
                .bookings
                .iter()
                .filter(|b| {
                    b.therapist_id == therapist_id
                        && b.booking_date == date
                        && b.status.occupies_slot()
                })
                .map(Booking::slot)
                .collect())
        }
    }

    #[async_trait]
    impl BookingTransaction for InMemoryTx {
        async fn lock_active_service(&mut self, service_id: i64) -> Result<Option<Service>, AppError> {
            Ok(self
                .staged
                .services
                .iter()
                .find(|s| s.id == service_id && s.is_active)
                .cloned())
        }

        async fn has_conflict(
            &mut self,
            therapist_id: i64,
            date: NaiveDate,
            slot: &TimeSlot,
        ) -> Result<bool, AppError> {
            Ok(self.staged.bookings.iter().any(|b| {
                b.therapist_id == therapist_id
                    && b.booking_date == date
                    && b.status.occupies_slot()
                    && b.slot().overlaps(slot)
            }))
        }

        async fn find_active_affiliate(&mut self, code: &str) -> Result<Option<Affiliate>, AppError> {
            Ok(self
                .staged
                .affiliates
                .iter()
                .find(|a| a.referral_code == code && a.is_active())
                .cloned())
        }

        async fn insert_booking(&mut self, booking: &Booking) -> Result<Booking, AppError> {
            self.staged.bookings.push(booking.clone());
            Ok(booking.clone())
        }

        async fn insert_commission(&mut self, commission: &Commission) -> Result<Commission, AppError> {
            if self.staged.fail_commission_insert {
                return Err(AppError::Internal("commission insert failed".into()));
            }
            self.staged.commissions.push(commission.clone());
            Ok(commission.clone())
        }

        async fn lock_booking(&mut self, id: i64) -> Result<Option<Booking>, AppError> {
            Ok(self.staged.bookings.iter().find(|b| b.id == id).cloned())
        }

        async fn set_booking_status(
            &mut self,
            id: i64,
            status: BookingStatus,
        ) -> Result<Booking, AppError> {
            let booking = self
                .staged
                .bookings
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
            booking.status = status;
            Ok(booking.clone())
        }

        async fn commission_for_booking(
            &mut self,
            booking_id: i64,
        ) -> Result<Option<Commission>, AppError> {
            Ok(self
                .staged
                .commissions
                .iter()
                .find(|c| c.booking_id == booking_id)
                .cloned())
        }

        async fn set_commission_status(
            &mut self,
            commission_id: i64,
            status: CommissionStatus,
            paid_at: Option<DateTime<Utc>>,
        ) -> Result<Commission, AppError> {
            let commission = self
                .staged
                .commissions
                .iter_mut()
                .find(|c| c.id == commission_id)
                .ok_or_else(|| AppError::NotFound("Commission not found".into()))?;
            commission.status = status;
            commission.paid_at = paid_at;
            Ok(commission.clone())
        }

        async fn commit(self) -> Result<(), AppError> {
            *self.shared.lock() = self.staged;
            Ok(())
        }
    }

    const THERAPIST_ID: i64 = 20;
    const THERAPIST_USER: i64 = 200;
    const AFFILIATE_ID: i64 = 30;
    const AFFILIATE_USER: i64 = 300;
    const SERVICE_ID: i64 = 10;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn day() -> NaiveDate {
        (Utc::now() + Duration::days(30)).date_naive()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn seeded() -> InMemoryBookings {
        let now = Utc::now();
        let repo = InMemoryBookings::default();
        {
            let mut store = repo.store.lock();
            store.services.push(Service {
                id: SERVICE_ID,
                therapist_id: THERAPIST_ID,
                name: "Massage".into(),
                description: None,
                duration_minutes: 60,
                price: d("80.00"),
                is_active: true,
                created_at: now,
                updated_at: now,
            });
            store.affiliates.push(Affiliate {
                id: AFFILIATE_ID,
                user_id: AFFILIATE_USER,
                referral_code: "REFER234".into(),
                commission_rate: d("12.50"),
                status: AffiliateStatus::Active,
                created_at: now,
                updated_at: now,
            });
            store.affiliates.push(Affiliate {
                id: 31,
                user_id: 301,
                referral_code: "SLEEPY23".into(),
                commission_rate: d("10.00"),
                status: AffiliateStatus::Suspended,
                created_at: now,
                updated_at: now,
            });
        }
        repo
    }

    fn therapists() -> MockTherapistRepository {
        let mut repo = MockTherapistRepository::new();
        repo.expect_find_by_user_id().returning(|uid| {
            Ok((uid == THERAPIST_USER).then(|| therapist(true)))
        });
        repo.expect_find_by_id()
            .returning(|id| Ok((id == THERAPIST_ID).then(|| therapist(true))));
        repo
    }

    fn therapist(is_active: bool) -> Therapist {
        let now = Utc::now();
        Therapist {
            id: THERAPIST_ID,
            user_id: THERAPIST_USER,
            full_name: "Dr. Lee".into(),
            specialization: "Massage".into(),
            bio: None,
            license_number: None,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn affiliates() -> MockAffiliateRepository {
        let mut repo = MockAffiliateRepository::new();
        repo.expect_find_by_user_id().returning(|uid| {
            Ok((uid == AFFILIATE_USER).then(|| {
                let now = Utc::now();
                Affiliate {
                    id: AFFILIATE_ID,
                    user_id: AFFILIATE_USER,
                    referral_code: "REFER234".into(),
                    commission_rate: d("12.50"),
                    status: AffiliateStatus::Active,
                    created_at: now,
                    updated_at: now,
                }
            }))
        });
        repo
    }

    type TestService =
        BookingServiceImpl<InMemoryBookings, MockTherapistRepository, MockAffiliateRepository>;

    fn service(repo: &InMemoryBookings, mailer: Arc<RecordingMailer>) -> TestService {
        BookingServiceImpl::new(
            Arc::new(repo.clone()),
            Arc::new(therapists()),
            Arc::new(affiliates()),
            Arc::new(SnowflakeGenerator::new(1)),
            mailer,
        )
    }

    fn request(start: NaiveTime, code: Option<&str>) -> NewBooking {
        NewBooking {
            service_id: SERVICE_ID,
            booking_date: day(),
            start_time: start,
            client_name: " Sam Client ".into(),
            client_email: "Sam@Example.com".into(),
            client_phone: None,
            notes: None,
            affiliate_code: code.map(str::to_string),
        }
    }

    fn client(id: i64) -> Actor {
        Actor::new(id, UserRole::Client)
    }

    #[tokio::test]
    async fn test_place_booking_without_affiliate() {
        let repo = seeded();
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&repo, mailer.clone());

        let placed = svc
            .place_booking(Some(client(40)), request(at(10, 0), None))
            .await
            .unwrap();

        assert_eq!(placed.booking.status, BookingStatus::Pending);
        assert_eq!(placed.booking.end_time, at(11, 0));
        assert_eq!(placed.booking.total_amount, d("80.00"));
        assert_eq!(placed.booking.client_user_id, Some(40));
        assert_eq!(placed.booking.client_email, "sam@example.com");
        assert_eq!(placed.booking.client_name, "Sam Client");
        assert!(placed.commission.is_none());

        let store = repo.snapshot();
        assert_eq!(store.bookings.len(), 1);
        assert!(store.commissions.is_empty());
        assert_eq!(mailer.kinds(), vec!["booking_received"]);
    }

    #[tokio::test]
    async fn test_place_booking_with_affiliate_creates_commission() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        let placed = svc
            .place_booking(None, request(at(10, 0), Some(" refer234 ")))
            .await
            .unwrap();

        let commission = placed.commission.expect("commission created");
        assert_eq!(placed.booking.affiliate_id, Some(AFFILIATE_ID));
        assert_eq!(placed.booking.client_user_id, None);
        assert_eq!(commission.booking_id, placed.booking.id);
        assert_eq!(commission.amount, d("10.00"));
        assert_eq!(commission.rate, d("12.50"));
        assert_eq!(commission.status, CommissionStatus::Pending);
        assert_eq!(repo.snapshot().commissions.len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_slot_conflicts() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        svc.place_booking(None, request(at(10, 0), None))
            .await
            .unwrap();
        let result = svc.place_booking(None, request(at(10, 30), None)).await;

        assert!(matches!(result, Err(BookingError::SlotTaken)));
        assert_eq!(repo.snapshot().bookings.len(), 1);
    }

    #[tokio::test]
    async fn test_adjacent_slot_is_free() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        svc.place_booking(None, request(at(10, 0), None))
            .await
            .unwrap();
        svc.place_booking(None, request(at(11, 0), None))
            .await
            .unwrap();

        assert_eq!(repo.snapshot().bookings.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_slot() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        let first = svc
            .place_booking(Some(client(40)), request(at(10, 0), None))
            .await
            .unwrap();
        svc.update_status(client(40), first.booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        assert!(svc
            .place_booking(None, request(at(10, 0), None))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_affiliate_code_rolls_back() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        let result = svc
            .place_booking(None, request(at(10, 0), Some("SLEEPY23")))
            .await;

        assert!(matches!(result, Err(BookingError::InvalidAffiliateCode)));
        assert!(repo.snapshot().bookings.is_empty());
    }

    #[tokio::test]
    async fn test_failed_commission_insert_leaves_no_booking() {
        let repo = seeded();
        repo.store.lock().fail_commission_insert = true;
        let svc = service(&repo, Arc::default());

        let result = svc
            .place_booking(None, request(at(10, 0), Some("REFER234")))
            .await;

        assert!(matches!(result, Err(BookingError::Store(_))));
        assert!(repo.snapshot().bookings.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());
        let mut input = request(at(10, 0), None);
        input.service_id = 999;

        assert!(matches!(
            svc.place_booking(None, input).await,
            Err(BookingError::ServiceNotFound)
        ));
    }

    #[tokio::test]
    async fn test_past_booking_rejected() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());
        let mut input = request(at(10, 0), None);
        input.booking_date = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();

        assert!(matches!(
            svc.place_booking(None, input).await,
            Err(BookingError::InPast)
        ));
    }

    #[tokio::test]
    async fn test_slot_crossing_midnight_rejected() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        assert!(matches!(
            svc.place_booking(None, request(at(23, 30), None)).await,
            Err(BookingError::InvalidSlot(SlotError::CrossesMidnight))
        ));
        assert!(repo.snapshot().bookings.is_empty());
    }

    #[tokio::test]
    async fn test_completing_booking_approves_commission() {
        let repo = seeded();
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&repo, mailer.clone());

        let placed = svc
            .place_booking(None, request(at(9, 0), Some("REFER234")))
            .await
            .unwrap();
        let therapist = Actor::new(THERAPIST_USER, UserRole::Therapist);

        let booking = svc
            .update_status(therapist, placed.booking.id, BookingStatus::Completed)
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Completed);
        assert_eq!(
            repo.snapshot().commissions[0].status,
            CommissionStatus::Approved
        );
        assert_eq!(
            mailer.kinds(),
            vec!["booking_received", "booking_status_changed"]
        );
    }

    #[tokio::test]
    async fn test_cancelling_booking_cancels_commission() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());
        let admin = Actor::new(1, UserRole::Admin);

        let placed = svc
            .place_booking(None, request(at(9, 0), Some("REFER234")))
            .await
            .unwrap();
        svc.update_status(admin, placed.booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(
            repo.snapshot().commissions[0].status,
            CommissionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_paid_commission_untouched_by_cancel() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());
        let admin = Actor::new(1, UserRole::Admin);

        let placed = svc
            .place_booking(None, request(at(9, 0), Some("REFER234")))
            .await
            .unwrap();
        repo.store.lock().commissions[0].status = CommissionStatus::Paid;

        svc.update_status(admin, placed.booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(repo.snapshot().commissions[0].status, CommissionStatus::Paid);
    }

    #[tokio::test]
    async fn test_client_may_only_cancel_own_booking() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        let placed = svc
            .place_booking(Some(client(40)), request(at(9, 0), None))
            .await
            .unwrap();

        assert!(matches!(
            svc.update_status(client(40), placed.booking.id, BookingStatus::Confirmed)
                .await,
            Err(BookingError::Forbidden(_))
        ));
        assert!(matches!(
            svc.update_status(client(41), placed.booking.id, BookingStatus::Cancelled)
                .await,
            Err(BookingError::NotFound)
        ));
        assert_eq!(repo.snapshot().bookings[0].status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_scoped_to_affiliate() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        svc.place_booking(None, request(at(9, 0), Some("REFER234")))
            .await
            .unwrap();
        svc.place_booking(None, request(at(11, 0), None))
            .await
            .unwrap();

        let affiliate = Actor::new(AFFILIATE_USER, UserRole::Affiliate);
        let page = svc
            .list_bookings(affiliate, BookingFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let stranger = client(99);
        let page = svc
            .list_bookings(stranger, BookingFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_list_includes_own_client_bookings() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());
        let affiliate = Actor::new(AFFILIATE_USER, UserRole::Affiliate);

        svc.place_booking(None, request(at(9, 0), Some("REFER234")))
            .await
            .unwrap();
        let own = svc
            .place_booking(Some(affiliate), request(at(11, 0), None))
            .await
            .unwrap()
            .booking;
        svc.place_booking(Some(client(41)), request(at(13, 0), None))
            .await
            .unwrap();

        let page = svc
            .list_bookings(affiliate, BookingFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().any(|b| b.id == own.id));

        let fetched = svc.get_booking(affiliate, own.id).await.unwrap();
        assert_eq!(fetched.id, own.id);
    }

    #[tokio::test]
    async fn test_availability() {
        let repo = seeded();
        let svc = service(&repo, Arc::default());

        svc.place_booking(None, request(at(9, 0), None))
            .await
            .unwrap();

        let slots = svc.availability(THERAPIST_ID, day()).await.unwrap();
        assert_eq!(
            slots,
            vec![TimeSlot {
                start: at(9, 0),
                end: at(10, 0)
            }]
        );

        assert!(matches!(
            svc.availability(999, day()).await,
            Err(BookingError::TherapistNotFound)
        ));
    }
}
