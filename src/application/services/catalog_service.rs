//! Catalog Service
//!
//! The bookable services offered by therapists.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{
    Actor, Page, PageRequest, Service, ServiceRepository, Therapist, TherapistRepository,
    UserRole, MAX_SERVICE_MINUTES, MIN_SERVICE_MINUTES,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn create_service(&self, actor: Actor, input: NewService) -> Result<Service, CatalogError>;

    /// Active services, optionally of one therapist
    async fn list_services(
        &self,
        therapist_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Service>, CatalogError>;

    /// Active services of an existing therapist
    async fn therapist_services(
        &self,
        therapist_id: i64,
        page: PageRequest,
    ) -> Result<Page<Service>, CatalogError>;

    async fn get_service(
        &self,
        actor: Option<Actor>,
        service_id: i64,
    ) -> Result<Service, CatalogError>;

    async fn update_service(
        &self,
        actor: Actor,
        service_id: i64,
        update: ServiceUpdate,
    ) -> Result<Service, CatalogError>;

    async fn deactivate_service(&self, actor: Actor, service_id: i64) -> Result<(), CatalogError>;
}

#[derive(Debug, Clone)]
pub struct NewService {
    /// Required for admins; therapists always create for themselves
    pub therapist_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Service not found")]
    NotFound,

    #[error("Therapist not found")]
    TherapistNotFound,

    #[error("therapist_id is required")]
    TherapistRequired,

    #[error("Duration out of range")]
    InvalidDuration,

    #[error("Price cannot be negative")]
    NegativePrice,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound => AppError::NotFound("Service not found".into()),
            CatalogError::TherapistNotFound => AppError::NotFound("Therapist not found".into()),
            CatalogError::TherapistRequired => {
                AppError::invalid_field("therapist_id", "therapist_id is required")
            }
            CatalogError::InvalidDuration => AppError::invalid_field(
                "duration_minutes",
                format!(
                    "Duration must be between {} and {} minutes",
                    MIN_SERVICE_MINUTES, MAX_SERVICE_MINUTES
                ),
            ),
            CatalogError::NegativePrice => {
                AppError::invalid_field("price", "Price cannot be negative")
            }
            CatalogError::Forbidden(msg) => AppError::Forbidden(msg.into()),
            CatalogError::Store(e) => e,
        }
    }
}

fn check_terms(duration_minutes: i32, price: Decimal) -> Result<(), CatalogError> {
    if !(MIN_SERVICE_MINUTES..=MAX_SERVICE_MINUTES).contains(&duration_minutes) {
        return Err(CatalogError::InvalidDuration);
    }
    if price.is_sign_negative() && !price.is_zero() {
        return Err(CatalogError::NegativePrice);
    }
    Ok(())
}

pub struct CatalogServiceImpl<S, T>
where
    S: ServiceRepository,
    T: TherapistRepository,
{
    service_repo: Arc<S>,
    therapist_repo: Arc<T>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<S, T> CatalogServiceImpl<S, T>
where
    S: ServiceRepository,
    T: TherapistRepository,
{
    pub fn new(
        service_repo: Arc<S>,
        therapist_repo: Arc<T>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            service_repo,
            therapist_repo,
            id_generator,
        }
    }

    async fn find(&self, service_id: i64) -> Result<Service, CatalogError> {
        self.service_repo
            .find_by_id(service_id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    async fn therapist(&self, therapist_id: i64) -> Result<Therapist, CatalogError> {
        self.therapist_repo
            .find_by_id(therapist_id)
            .await?
            .ok_or(CatalogError::TherapistNotFound)
    }

    /// Whether the actor may manage services of `therapist_id`
    async fn manages(&self, actor: Actor, therapist_id: i64) -> Result<bool, CatalogError> {
        if actor.is_admin() {
            return Ok(true);
        }
        if actor.role != UserRole::Therapist {
            return Ok(false);
        }
        let own = self.therapist_repo.find_by_user_id(actor.user_id).await?;
        Ok(own.is_some_and(|t| t.id == therapist_id))
    }
}

#[async_trait]
impl<S, T> CatalogService for CatalogServiceImpl<S, T>
where
    S: ServiceRepository + 'static,
    T: TherapistRepository + 'static,
{
    async fn create_service(&self, actor: Actor, input: NewService) -> Result<Service, CatalogError> {
        let therapist = match actor.role {
            UserRole::Admin => {
                let therapist_id = input.therapist_id.ok_or(CatalogError::TherapistRequired)?;
                self.therapist(therapist_id).await?
            }
            UserRole::Therapist => {
                let own = self
                    .therapist_repo
                    .find_by_user_id(actor.user_id)
                    .await?
                    .ok_or(CatalogError::Forbidden("No therapist profile for this account"))?;
                if input.therapist_id.is_some_and(|id| id != own.id) {
                    return Err(CatalogError::Forbidden(
                        "You can only create services for yourself",
                    ));
                }
                own
            }
            _ => {
                return Err(CatalogError::Forbidden(
                    "Only therapists and admins can create services",
                ))
            }
        };

        check_terms(input.duration_minutes, input.price)?;

        let now = Utc::now();
        let service = Service {
            id: self.id_generator.generate(),
            therapist_id: therapist.id,
            name: input.name.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            duration_minutes: input.duration_minutes,
            price: input.price,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let created = self.service_repo.create(&service).await?;
        tracing::info!(service_id = created.id, therapist_id = therapist.id, "Service created");

        Ok(created)
    }

    async fn list_services(
        &self,
        therapist_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Service>, CatalogError> {
        Ok(self.service_repo.list_active(therapist_id, page).await?)
    }

    async fn therapist_services(
        &self,
        therapist_id: i64,
        page: PageRequest,
    ) -> Result<Page<Service>, CatalogError> {
        self.therapist(therapist_id).await?;
        Ok(self.service_repo.list_active(Some(therapist_id), page).await?)
    }

    async fn get_service(
        &self,
        actor: Option<Actor>,
        service_id: i64,
    ) -> Result<Service, CatalogError> {
        let service = self.find(service_id).await?;

        if !service.is_active {
            let manages = match actor {
                Some(actor) => self.manages(actor, service.therapist_id).await?,
                None => false,
            };
            if !manages {
                return Err(CatalogError::NotFound);
            }
        }

        Ok(service)
    }

    async fn update_service(
        &self,
        actor: Actor,
        service_id: i64,
        update: ServiceUpdate,
    ) -> Result<Service, CatalogError> {
        let mut service = self.find(service_id).await?;

        if !self.manages(actor, service.therapist_id).await? {
            return Err(CatalogError::Forbidden("You can only manage your own services"));
        }

        if let Some(name) = update.name {
            service.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            service.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(duration) = update.duration_minutes {
            service.duration_minutes = duration;
        }
        if let Some(price) = update.price {
            service.price = price;
        }
        if let Some(is_active) = update.is_active {
            service.is_active = is_active;
        }
        check_terms(service.duration_minutes, service.price)?;
        service.updated_at = Utc::now();

        Ok(self.service_repo.update(&service).await?)
    }

    async fn deactivate_service(&self, actor: Actor, service_id: i64) -> Result<(), CatalogError> {
        self.update_service(
            actor,
            service_id,
            ServiceUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(service_id, by = actor.user_id, "Service deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockServiceRepository, MockTherapistRepository};
    use test_case::test_case;

    fn therapist(id: i64, user_id: i64) -> Therapist {
        let now = Utc::now();
        Therapist {
            id,
            user_id,
            full_name: "Dr. Lee".into(),
            specialization: "Massage".into(),
            bio: None,
            license_number: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn stored_service(id: i64, therapist_id: i64, is_active: bool) -> Service {
        let now = Utc::now();
        Service {
            id,
            therapist_id,
            name: "Massage".into(),
            description: None,
            duration_minutes: 60,
            price: Decimal::new(8000, 2),
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_service(therapist_id: Option<i64>) -> NewService {
        NewService {
            therapist_id,
            name: " Deep tissue ".into(),
            description: None,
            duration_minutes: 60,
            price: Decimal::new(8000, 2),
        }
    }

    fn service(
        services: MockServiceRepository,
        therapists: MockTherapistRepository,
    ) -> CatalogServiceImpl<MockServiceRepository, MockTherapistRepository> {
        CatalogServiceImpl::new(
            Arc::new(services),
            Arc::new(therapists),
            Arc::new(SnowflakeGenerator::new(1)),
        )
    }

    #[test_case(4, "10.00", false)]
    #[test_case(5, "0", true)]
    #[test_case(480, "10.00", true)]
    #[test_case(481, "10.00", false)]
    #[test_case(60, "-0.01", false)]
    fn test_check_terms(duration: i32, price: &str, ok: bool) {
        assert_eq!(check_terms(duration, price.parse().unwrap()).is_ok(), ok);
    }

    #[tokio::test]
    async fn test_admin_must_name_therapist() {
        let result = service(MockServiceRepository::new(), MockTherapistRepository::new())
            .create_service(Actor::new(1, UserRole::Admin), new_service(None))
            .await;
        assert!(matches!(result, Err(CatalogError::TherapistRequired)));
    }

    #[tokio::test]
    async fn test_therapist_creates_own_service() {
        let mut therapists = MockTherapistRepository::new();
        therapists
            .expect_find_by_user_id()
            .returning(|uid| Ok(Some(therapist(20, uid))));
        let mut services = MockServiceRepository::new();
        services.expect_create().returning(|s| Ok(s.clone()));

        let created = service(services, therapists)
            .create_service(Actor::new(5, UserRole::Therapist), new_service(None))
            .await
            .unwrap();

        assert_eq!(created.therapist_id, 20);
        assert_eq!(created.name, "Deep tissue");
    }

    #[tokio::test]
    async fn test_therapist_cannot_create_for_other() {
        let mut therapists = MockTherapistRepository::new();
        therapists
            .expect_find_by_user_id()
            .returning(|uid| Ok(Some(therapist(20, uid))));

        let result = service(MockServiceRepository::new(), therapists)
            .create_service(Actor::new(5, UserRole::Therapist), new_service(Some(21)))
            .await;
        assert!(matches!(result, Err(CatalogError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_client_cannot_create() {
        let result = service(MockServiceRepository::new(), MockTherapistRepository::new())
            .create_service(Actor::new(5, UserRole::Client), new_service(Some(20)))
            .await;
        assert!(matches!(result, Err(CatalogError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_inactive_service_hidden_from_public() {
        let mut services = MockServiceRepository::new();
        services
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored_service(id, 20, false))));

        let result = service(services, MockTherapistRepository::new())
            .get_service(None, 3)
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_duration() {
        let mut services = MockServiceRepository::new();
        services
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored_service(id, 20, true))));
        services.expect_update().never();

        let result = service(services, MockTherapistRepository::new())
            .update_service(
                Actor::new(1, UserRole::Admin),
                3,
                ServiceUpdate {
                    duration_minutes: Some(1000),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(CatalogError::InvalidDuration)));
    }

    #[tokio::test]
    async fn test_therapist_services_unknown_therapist() {
        let mut therapists = MockTherapistRepository::new();
        therapists.expect_find_by_id().returning(|_| Ok(None));

        let result = service(MockServiceRepository::new(), therapists)
            .therapist_services(99, PageRequest::default())
            .await;
        assert!(matches!(result, Err(CatalogError::TherapistNotFound)));
    }
}
