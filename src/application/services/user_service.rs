//! User Service
//!
//! Account administration: listing, profile edits, role changes and
//! soft deactivation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Actor, Page, PageRequest, SessionRepository, User, UserFilter, UserRepository, UserRole,
};
use crate::shared::error::AppError;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// List users (admin only)
    async fn list_users(
        &self,
        actor: Actor,
        filter: UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, UserError>;

    /// Get a user (admin or self)
    async fn get_user(&self, actor: Actor, user_id: i64) -> Result<User, UserError>;

    /// Update profile fields; role and active flag are admin only
    async fn update_user(
        &self,
        actor: Actor,
        user_id: i64,
        update: UserUpdate,
    ) -> Result<User, UserError>;

    /// Soft-delete a user and revoke their sessions (admin only)
    async fn deactivate_user(&self, actor: Actor, user_id: i64) -> Result<(), UserError>;
}

/// Partial update of a user
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("You cannot deactivate your own account")]
    CannotDeactivateSelf,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound => AppError::NotFound("User not found".into()),
            UserError::Forbidden(msg) => AppError::Forbidden(msg.into()),
            UserError::CannotDeactivateSelf => {
                AppError::BadRequest("You cannot deactivate your own account".into())
            }
            UserError::Store(e) => e,
        }
    }
}

/// UserService implementation
pub struct UserServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
}

impl<U, S> UserServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    pub fn new(user_repo: Arc<U>, session_repo: Arc<S>) -> Self {
        Self {
            user_repo,
            session_repo,
        }
    }

    async fn find(&self, user_id: i64) -> Result<User, UserError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound)
    }
}

#[async_trait]
impl<U, S> UserService for UserServiceImpl<U, S>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn list_users(
        &self,
        actor: Actor,
        filter: UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, UserError> {
        if !actor.is_admin() {
            return Err(UserError::Forbidden("Admin access required"));
        }

        Ok(self.user_repo.list(&filter, page).await?)
    }

    async fn get_user(&self, actor: Actor, user_id: i64) -> Result<User, UserError> {
        if !actor.is_self_or_admin(user_id) {
            return Err(UserError::Forbidden("You can only view your own account"));
        }

        self.find(user_id).await
    }

    async fn update_user(
        &self,
        actor: Actor,
        user_id: i64,
        update: UserUpdate,
    ) -> Result<User, UserError> {
        if !actor.is_self_or_admin(user_id) {
            return Err(UserError::Forbidden("You can only update your own account"));
        }
        if !actor.is_admin() && (update.role.is_some() || update.is_active.is_some()) {
            return Err(UserError::Forbidden("Only admins can change role or status"));
        }

        let mut user = self.find(user_id).await?;

        if let Some(full_name) = update.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(is_active) = update.is_active {
            if !is_active && user.id == actor.user_id {
                return Err(UserError::CannotDeactivateSelf);
            }
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();

        let updated = self.user_repo.update(&user).await?;
        if !updated.is_active {
            self.session_repo.revoke_all_for_user(updated.id).await?;
        }

        Ok(updated)
    }

    async fn deactivate_user(&self, actor: Actor, user_id: i64) -> Result<(), UserError> {
        if !actor.is_admin() {
            return Err(UserError::Forbidden("Admin access required"));
        }
        if actor.user_id == user_id {
            return Err(UserError::CannotDeactivateSelf);
        }

        self.find(user_id).await?;
        self.user_repo.deactivate(user_id).await?;
        let revoked = self.session_repo.revoke_all_for_user(user_id).await?;

        tracing::info!(user_id, by = actor.user_id, revoked_sessions = revoked, "User deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockSessionRepository, MockUserRepository};
    use mockall::predicate::eq;

    fn admin() -> Actor {
        Actor::new(1, UserRole::Admin)
    }

    fn client(id: i64) -> Actor {
        Actor::new(id, UserRole::Client)
    }

    fn user(id: i64) -> User {
        User {
            id,
            email: format!("user{id}@example.com"),
            full_name: "Someone".into(),
            ..User::default()
        }
    }

    fn service(
        users: MockUserRepository,
        sessions: MockSessionRepository,
    ) -> UserServiceImpl<MockUserRepository, MockSessionRepository> {
        UserServiceImpl::new(Arc::new(users), Arc::new(sessions))
    }

    #[tokio::test]
    async fn test_list_requires_admin() {
        let svc = service(MockUserRepository::new(), MockSessionRepository::new());
        let result = svc
            .list_users(client(5), UserFilter::default(), PageRequest::default())
            .await;
        assert!(matches!(result, Err(UserError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_get_other_user_forbidden() {
        let svc = service(MockUserRepository::new(), MockSessionRepository::new());
        assert!(matches!(
            svc.get_user(client(5), 6).await,
            Err(UserError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_self_cannot_change_role() {
        let svc = service(MockUserRepository::new(), MockSessionRepository::new());
        let update = UserUpdate {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_user(client(5), 5, update).await,
            Err(UserError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_self_updates_profile() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .with(eq(5))
            .returning(|id| Ok(Some(user(id))));
        users.expect_update().returning(|u| Ok(u.clone()));

        let svc = service(users, MockSessionRepository::new());
        let updated = svc
            .update_user(
                client(5),
                5,
                UserUpdate {
                    full_name: Some("  New Name ".into()),
                    phone: Some("".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name, "New Name");
        assert_eq!(updated.phone, None);
    }

    #[tokio::test]
    async fn test_admin_cannot_deactivate_self() {
        let svc = service(MockUserRepository::new(), MockSessionRepository::new());
        assert!(matches!(
            svc.deactivate_user(admin(), 1).await,
            Err(UserError::CannotDeactivateSelf)
        ));
    }

    #[tokio::test]
    async fn test_deactivate_revokes_sessions() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(user(id))));
        users
            .expect_deactivate()
            .with(eq(9))
            .times(1)
            .returning(|_| Ok(()));

        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_revoke_all_for_user()
            .with(eq(9))
            .times(1)
            .returning(|_| Ok(2));

        let svc = service(users, sessions);
        svc.deactivate_user(admin(), 9).await.unwrap();
    }

    #[tokio::test]
    async fn test_deactivate_unknown_user() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let svc = service(users, MockSessionRepository::new());
        assert!(matches!(
            svc.deactivate_user(admin(), 9).await,
            Err(UserError::NotFound)
        ));
    }
}
