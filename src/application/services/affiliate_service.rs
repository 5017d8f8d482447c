//! Affiliate Service
//!
//! Affiliate enrollment, referral codes and per-affiliate statistics.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::codes::{
    generate_referral_code, is_valid_referral_code, normalize_code, MAX_CODE_ATTEMPTS,
};
use crate::domain::services::commission_policy::is_valid_rate;
use crate::domain::{
    Actor, Affiliate, AffiliateRepository, AffiliateStats, AffiliateStatus, Page, PageRequest,
    UserRepository, UserRole,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait AffiliateService: Send + Sync {
    /// Enroll a user as an affiliate
    async fn create_affiliate(
        &self,
        actor: Actor,
        input: NewAffiliate,
    ) -> Result<Affiliate, AffiliateError>;

    async fn list_affiliates(
        &self,
        actor: Actor,
        status: Option<AffiliateStatus>,
        page: PageRequest,
    ) -> Result<Page<Affiliate>, AffiliateError>;

    /// The caller's own affiliate profile
    async fn my_affiliate(&self, actor: Actor) -> Result<Affiliate, AffiliateError>;

    /// Whether a referral code belongs to an active affiliate.
    /// Returns the normalized code alongside.
    async fn validate_code(&self, code: &str) -> Result<(bool, String), AffiliateError>;

    async fn get_affiliate(
        &self,
        actor: Actor,
        affiliate_id: i64,
    ) -> Result<(Affiliate, AffiliateStats), AffiliateError>;

    async fn update_affiliate(
        &self,
        actor: Actor,
        affiliate_id: i64,
        update: AffiliateUpdate,
    ) -> Result<Affiliate, AffiliateError>;

    async fn deactivate_affiliate(
        &self,
        actor: Actor,
        affiliate_id: i64,
    ) -> Result<(), AffiliateError>;
}

#[derive(Debug, Clone, Default)]
pub struct NewAffiliate {
    /// Defaults to the caller
    pub user_id: Option<i64>,
    /// Defaults to the configured rate
    pub commission_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct AffiliateUpdate {
    pub commission_rate: Option<Decimal>,
    pub status: Option<AffiliateStatus>,
}

#[derive(Debug, thiserror::Error)]
pub enum AffiliateError {
    #[error("Affiliate not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("User is already an affiliate")]
    AlreadyAffiliate,

    #[error("Commission rate must be between 0 and 100")]
    InvalidRate,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Could not generate a unique referral code")]
    CodeExhausted,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<AffiliateError> for AppError {
    fn from(e: AffiliateError) -> Self {
        match e {
            AffiliateError::NotFound => AppError::NotFound("Affiliate not found".into()),
            AffiliateError::UserNotFound => AppError::NotFound("User not found".into()),
            AffiliateError::AlreadyAffiliate => {
                AppError::Conflict("User is already an affiliate".into())
            }
            AffiliateError::InvalidRate => AppError::invalid_field(
                "commission_rate",
                "Commission rate must be between 0 and 100",
            ),
            AffiliateError::Forbidden(msg) => AppError::Forbidden(msg.into()),
            AffiliateError::CodeExhausted => {
                AppError::Internal("Could not generate a unique referral code".into())
            }
            AffiliateError::Store(e) => e,
        }
    }
}

pub struct AffiliateServiceImpl<A, U>
where
    A: AffiliateRepository,
    U: UserRepository,
{
    affiliate_repo: Arc<A>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
    default_rate: Decimal,
}

impl<A, U> AffiliateServiceImpl<A, U>
where
    A: AffiliateRepository,
    U: UserRepository,
{
    pub fn new(
        affiliate_repo: Arc<A>,
        user_repo: Arc<U>,
        id_generator: Arc<SnowflakeGenerator>,
        default_rate: Decimal,
    ) -> Self {
        Self {
            affiliate_repo,
            user_repo,
            id_generator,
            default_rate,
        }
    }

    async fn find(&self, affiliate_id: i64) -> Result<Affiliate, AffiliateError> {
        self.affiliate_repo
            .find_by_id(affiliate_id)
            .await?
            .ok_or(AffiliateError::NotFound)
    }

    async fn unused_code(&self) -> Result<String, AffiliateError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_referral_code();
            if !self.affiliate_repo.code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(AffiliateError::CodeExhausted)
    }
}

#[async_trait]
impl<A, U> AffiliateService for AffiliateServiceImpl<A, U>
where
    A: AffiliateRepository + 'static,
    U: UserRepository + 'static,
{
    async fn create_affiliate(
        &self,
        actor: Actor,
        input: NewAffiliate,
    ) -> Result<Affiliate, AffiliateError> {
        let user_id = input.user_id.unwrap_or(actor.user_id);

        if !actor.is_admin() {
            if user_id != actor.user_id {
                return Err(AffiliateError::Forbidden(
                    "You can only enroll yourself as an affiliate",
                ));
            }
            if input.commission_rate.is_some() {
                return Err(AffiliateError::Forbidden(
                    "Only admins can set a commission rate",
                ));
            }
        }

        let commission_rate = input.commission_rate.unwrap_or(self.default_rate);
        if !is_valid_rate(commission_rate) {
            return Err(AffiliateError::InvalidRate);
        }

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AffiliateError::UserNotFound)?;

        if self.affiliate_repo.find_by_user_id(user.id).await?.is_some() {
            return Err(AffiliateError::AlreadyAffiliate);
        }

        let now = Utc::now();
        let affiliate = Affiliate {
            id: self.id_generator.generate(),
            user_id: user.id,
            referral_code: self.unused_code().await?,
            commission_rate,
            status: AffiliateStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .affiliate_repo
            .create(&affiliate, user.role == UserRole::Client)
            .await?;

        tracing::info!(
            affiliate_id = created.id,
            user_id = user.id,
            referral_code = %created.referral_code,
            "Affiliate created"
        );

        Ok(created)
    }

    async fn list_affiliates(
        &self,
        actor: Actor,
        status: Option<AffiliateStatus>,
        page: PageRequest,
    ) -> Result<Page<Affiliate>, AffiliateError> {
        if !actor.is_admin() {
            return Err(AffiliateError::Forbidden("Admin access required"));
        }

        Ok(self.affiliate_repo.list(status, page).await?)
    }

    async fn my_affiliate(&self, actor: Actor) -> Result<Affiliate, AffiliateError> {
        self.affiliate_repo
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or(AffiliateError::NotFound)
    }

    async fn validate_code(&self, code: &str) -> Result<(bool, String), AffiliateError> {
        let code = normalize_code(code);
        if !is_valid_referral_code(&code) {
            return Ok((false, code));
        }

        let valid = self
            .affiliate_repo
            .find_by_code(&code)
            .await?
            .is_some_and(|a| a.is_active());

        Ok((valid, code))
    }

    async fn get_affiliate(
        &self,
        actor: Actor,
        affiliate_id: i64,
    ) -> Result<(Affiliate, AffiliateStats), AffiliateError> {
        let affiliate = self.find(affiliate_id).await?;

        if !actor.is_self_or_admin(affiliate.user_id) {
            return Err(AffiliateError::Forbidden("You can only view your own affiliate profile"));
        }

        let stats = self.affiliate_repo.stats(affiliate.id).await?;
        Ok((affiliate, stats))
    }

    async fn update_affiliate(
        &self,
        actor: Actor,
        affiliate_id: i64,
        update: AffiliateUpdate,
    ) -> Result<Affiliate, AffiliateError> {
        if !actor.is_admin() {
            return Err(AffiliateError::Forbidden("Admin access required"));
        }

        let mut affiliate = self.find(affiliate_id).await?;

        if let Some(rate) = update.commission_rate {
            if !is_valid_rate(rate) {
                return Err(AffiliateError::InvalidRate);
            }
            affiliate.commission_rate = rate;
        }
        if let Some(status) = update.status {
            affiliate.status = status;
        }
        affiliate.updated_at = Utc::now();

        Ok(self.affiliate_repo.update(&affiliate).await?)
    }

    async fn deactivate_affiliate(
        &self,
        actor: Actor,
        affiliate_id: i64,
    ) -> Result<(), AffiliateError> {
        self.update_affiliate(
            actor,
            affiliate_id,
            AffiliateUpdate {
                status: Some(AffiliateStatus::Inactive),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(affiliate_id, by = actor.user_id, "Affiliate deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockAffiliateRepository, MockUserRepository, User};
    use mockall::predicate::eq;

    fn rate(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn service(
        affiliates: MockAffiliateRepository,
        users: MockUserRepository,
    ) -> AffiliateServiceImpl<MockAffiliateRepository, MockUserRepository> {
        AffiliateServiceImpl::new(
            Arc::new(affiliates),
            Arc::new(users),
            Arc::new(SnowflakeGenerator::new(1)),
            rate("10.00"),
        )
    }

    fn affiliate(id: i64, user_id: i64, status: AffiliateStatus) -> Affiliate {
        let now = Utc::now();
        Affiliate {
            id,
            user_id,
            referral_code: "ABCD2345".into(),
            commission_rate: rate("10.00"),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn client_user(id: i64) -> User {
        User {
            id,
            email: "c@example.com".into(),
            role: UserRole::Client,
            ..User::default()
        }
    }

    #[tokio::test]
    async fn test_self_enrollment_uses_default_rate_and_promotes() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .with(eq(5))
            .returning(|id| Ok(Some(client_user(id))));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates.expect_code_exists().returning(|_| Ok(false));
        affiliates
            .expect_create()
            .withf(|_, promote_user| *promote_user)
            .times(1)
            .returning(|a, _| Ok(a.clone()));

        let svc = service(affiliates, users);
        let created = svc
            .create_affiliate(Actor::new(5, UserRole::Client), NewAffiliate::default())
            .await
            .unwrap();

        assert_eq!(created.user_id, 5);
        assert_eq!(created.commission_rate, rate("10.00"));
        assert!(is_valid_referral_code(&created.referral_code));
    }

    #[tokio::test]
    async fn test_enrolling_therapist_keeps_role() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                role: UserRole::Therapist,
                ..client_user(id)
            }))
        });

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates.expect_code_exists().returning(|_| Ok(false));
        affiliates
            .expect_create()
            .withf(|_, promote_user| !*promote_user)
            .times(1)
            .returning(|a, _| Ok(a.clone()));

        let svc = service(affiliates, users);
        let created = svc
            .create_affiliate(
                Actor::new(1, UserRole::Admin),
                NewAffiliate {
                    user_id: Some(7),
                    commission_rate: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(created.user_id, 7);
    }

    #[tokio::test]
    async fn test_failed_enrollment_write_is_reported() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(client_user(id))));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates.expect_code_exists().returning(|_| Ok(false));
        affiliates
            .expect_create()
            .times(1)
            .returning(|_, _| Err(AppError::NotFound("User not found".into())));

        let svc = service(affiliates, users);
        let result = svc
            .create_affiliate(Actor::new(5, UserRole::Client), NewAffiliate::default())
            .await;

        assert!(matches!(result, Err(AffiliateError::Store(AppError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_pick_rate() {
        let svc = service(MockAffiliateRepository::new(), MockUserRepository::new());
        let result = svc
            .create_affiliate(
                Actor::new(5, UserRole::Client),
                NewAffiliate {
                    commission_rate: Some(rate("50")),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AffiliateError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_rate_out_of_range() {
        let svc = service(MockAffiliateRepository::new(), MockUserRepository::new());
        let result = svc
            .create_affiliate(
                Actor::new(1, UserRole::Admin),
                NewAffiliate {
                    user_id: Some(5),
                    commission_rate: Some(rate("100.5")),
                },
            )
            .await;

        assert!(matches!(result, Err(AffiliateError::InvalidRate)));
    }

    #[tokio::test]
    async fn test_already_affiliate_conflict() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(client_user(id))));
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_user_id()
            .returning(|uid| Ok(Some(affiliate(9, uid, AffiliateStatus::Active))));

        let svc = service(affiliates, users);
        let result = svc
            .create_affiliate(Actor::new(5, UserRole::Client), NewAffiliate::default())
            .await;

        assert!(matches!(result, Err(AffiliateError::AlreadyAffiliate)));
    }

    #[tokio::test]
    async fn test_code_generation_gives_up() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(client_user(id))));
        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates
            .expect_code_exists()
            .times(MAX_CODE_ATTEMPTS)
            .returning(|_| Ok(true));

        let svc = service(affiliates, users);
        let result = svc
            .create_affiliate(Actor::new(5, UserRole::Client), NewAffiliate::default())
            .await;

        assert!(matches!(result, Err(AffiliateError::CodeExhausted)));
    }

    #[tokio::test]
    async fn test_validate_code() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_code()
            .withf(|code| code == "ABCD2345")
            .returning(|_| Ok(Some(affiliate(9, 5, AffiliateStatus::Suspended))));

        let svc = service(affiliates, MockUserRepository::new());

        assert_eq!(
            svc.validate_code(" abcd2345 ").await.unwrap(),
            (false, "ABCD2345".to_string())
        );
        // Malformed codes never reach the store
        assert_eq!(
            svc.validate_code("nope").await.unwrap(),
            (false, "NOPE".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_affiliate_owner_only() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_id()
            .returning(|id| Ok(Some(affiliate(id, 5, AffiliateStatus::Active))));
        affiliates
            .expect_stats()
            .returning(|_| Ok(AffiliateStats::default()));

        let svc = service(affiliates, MockUserRepository::new());

        assert!(svc
            .get_affiliate(Actor::new(5, UserRole::Affiliate), 9)
            .await
            .is_ok());
        assert!(matches!(
            svc.get_affiliate(Actor::new(6, UserRole::Affiliate), 9).await,
            Err(AffiliateError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_deactivate_sets_inactive() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_id()
            .returning(|id| Ok(Some(affiliate(id, 5, AffiliateStatus::Active))));
        affiliates
            .expect_update()
            .withf(|a| a.status == AffiliateStatus::Inactive)
            .times(1)
            .returning(|a| Ok(a.clone()));

        let svc = service(affiliates, MockUserRepository::new());
        svc.deactivate_affiliate(Actor::new(1, UserRole::Admin), 9)
            .await
            .unwrap();
    }
}
