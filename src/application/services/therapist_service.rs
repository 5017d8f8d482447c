//! Therapist Service
//!
//! Therapist profiles. Creating one promotes the linked user to the
//! `therapist` role.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Actor, Page, PageRequest, Therapist, TherapistFilter, TherapistRepository, UserRepository,
    UserRole,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait TherapistService: Send + Sync {
    async fn create_therapist(
        &self,
        actor: Actor,
        input: NewTherapist,
    ) -> Result<Therapist, TherapistError>;

    /// Public listing; inactive profiles only for admins
    async fn list_therapists(
        &self,
        actor: Option<Actor>,
        filter: TherapistFilter,
        page: PageRequest,
    ) -> Result<Page<Therapist>, TherapistError>;

    async fn get_therapist(
        &self,
        actor: Option<Actor>,
        therapist_id: i64,
    ) -> Result<Therapist, TherapistError>;

    async fn update_therapist(
        &self,
        actor: Actor,
        therapist_id: i64,
        update: TherapistUpdate,
    ) -> Result<Therapist, TherapistError>;

    async fn deactivate_therapist(
        &self,
        actor: Actor,
        therapist_id: i64,
    ) -> Result<(), TherapistError>;
}

#[derive(Debug, Clone)]
pub struct NewTherapist {
    pub user_id: i64,
    pub specialization: String,
    pub bio: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TherapistUpdate {
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub license_number: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum TherapistError {
    #[error("Therapist not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("User is already a therapist")]
    AlreadyTherapist,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<TherapistError> for AppError {
    fn from(e: TherapistError) -> Self {
        match e {
            TherapistError::NotFound => AppError::NotFound("Therapist not found".into()),
            TherapistError::UserNotFound => AppError::NotFound("User not found".into()),
            TherapistError::AlreadyTherapist => {
                AppError::Conflict("User is already a therapist".into())
            }
            TherapistError::Forbidden(msg) => AppError::Forbidden(msg.into()),
            TherapistError::Store(e) => e,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct TherapistServiceImpl<T, U>
where
    T: TherapistRepository,
    U: UserRepository,
{
    therapist_repo: Arc<T>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<T, U> TherapistServiceImpl<T, U>
where
    T: TherapistRepository,
    U: UserRepository,
{
    pub fn new(
        therapist_repo: Arc<T>,
        user_repo: Arc<U>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            therapist_repo,
            user_repo,
            id_generator,
        }
    }

    async fn find(&self, therapist_id: i64) -> Result<Therapist, TherapistError> {
        self.therapist_repo
            .find_by_id(therapist_id)
            .await?
            .ok_or(TherapistError::NotFound)
    }
}

#[async_trait]
impl<T, U> TherapistService for TherapistServiceImpl<T, U>
where
    T: TherapistRepository + 'static,
    U: UserRepository + 'static,
{
    async fn create_therapist(
        &self,
        actor: Actor,
        input: NewTherapist,
    ) -> Result<Therapist, TherapistError> {
        if !actor.is_admin() {
            return Err(TherapistError::Forbidden("Admin access required"));
        }

        let user = self
            .user_repo
            .find_by_id(input.user_id)
            .await?
            .ok_or(TherapistError::UserNotFound)?;

        if self.therapist_repo.find_by_user_id(user.id).await?.is_some() {
            return Err(TherapistError::AlreadyTherapist);
        }

        let now = Utc::now();
        let therapist = Therapist {
            id: self.id_generator.generate(),
            user_id: user.id,
            full_name: user.full_name.clone(),
            specialization: input.specialization.trim().to_string(),
            bio: non_empty(input.bio),
            license_number: non_empty(input.license_number),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let promote_user = user.role != UserRole::Admin && user.role != UserRole::Therapist;
        let created = self.therapist_repo.create(&therapist, promote_user).await?;

        tracing::info!(therapist_id = created.id, user_id = user.id, "Therapist created");
        Ok(created)
    }

    async fn list_therapists(
        &self,
        actor: Option<Actor>,
        mut filter: TherapistFilter,
        page: PageRequest,
    ) -> Result<Page<Therapist>, TherapistError> {
        if !actor.is_some_and(|a| a.is_admin()) {
            filter.include_inactive = false;
        }

        Ok(self.therapist_repo.list(&filter, page).await?)
    }

    async fn get_therapist(
        &self,
        actor: Option<Actor>,
        therapist_id: i64,
    ) -> Result<Therapist, TherapistError> {
        let therapist = self.find(therapist_id).await?;

        let visible = therapist.is_active
            || actor.is_some_and(|a| a.is_self_or_admin(therapist.user_id));
        if !visible {
            return Err(TherapistError::NotFound);
        }

        Ok(therapist)
    }

    async fn update_therapist(
        &self,
        actor: Actor,
        therapist_id: i64,
        update: TherapistUpdate,
    ) -> Result<Therapist, TherapistError> {
        let mut therapist = self.find(therapist_id).await?;

        if !actor.is_self_or_admin(therapist.user_id) {
            return Err(TherapistError::Forbidden("You can only update your own profile"));
        }
        if update.is_active.is_some() && !actor.is_admin() {
            return Err(TherapistError::Forbidden("Only admins can change therapist status"));
        }

        if let Some(specialization) = update.specialization {
            therapist.specialization = specialization.trim().to_string();
        }
        if update.bio.is_some() {
            therapist.bio = non_empty(update.bio);
        }
        if update.license_number.is_some() {
            therapist.license_number = non_empty(update.license_number);
        }
        if let Some(is_active) = update.is_active {
            therapist.is_active = is_active;
        }
        therapist.updated_at = Utc::now();

        Ok(self.therapist_repo.update(&therapist).await?)
    }

    async fn deactivate_therapist(
        &self,
        actor: Actor,
        therapist_id: i64,
    ) -> Result<(), TherapistError> {
        if !actor.is_admin() {
            return Err(TherapistError::Forbidden("Admin access required"));
        }

        self.update_therapist(
            actor,
            therapist_id,
            TherapistUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(therapist_id, by = actor.user_id, "Therapist deactivated");
        Ok(())
    }
}
