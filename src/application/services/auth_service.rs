//! Authentication Service
//!
//! Handles registration, credential checks, JWT access tokens and the
//! rotating refresh-token sessions behind them.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::JwtSettings;
use crate::domain::{Session, SessionRepository, User, UserRepository, UserRole};
use crate::infrastructure::email::{notify, EmailTemplate, Mailer};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

const REFRESH_TOKEN_LEN: usize = 64;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new client account
    async fn register(&self, account: NewAccount) -> Result<(User, AuthTokens), AuthError>;

    /// Authenticate with email and password
    async fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<String>,
    ) -> Result<(User, AuthTokens), AuthError>;

    /// Exchange a refresh token for a new token pair
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke a refresh token; unknown tokens are ignored
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;

    async fn current_user(&self, user_id: i64) -> Result<User, AuthError>;

    /// Change password and sign out every session
    async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

/// Registration input
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

/// Authentication tokens response
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role at the time of issue
    pub role: UserRole,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDisabled,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already registered")]
    EmailExists,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".into())
            }
            AuthError::AccountDisabled => AppError::Forbidden("Account is deactivated".into()),
            AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
            AuthError::InvalidToken => AppError::Unauthorized("Invalid token".into()),
            AuthError::InvalidRefreshToken => {
                AppError::Unauthorized("Invalid or expired refresh token".into())
            }
            AuthError::WrongPassword => {
                AppError::Unauthorized("Current password is incorrect".into())
            }
            AuthError::UserNotFound => AppError::NotFound("User not found".into()),
            AuthError::EmailExists => AppError::Conflict("Email already registered".into()),
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Store(e) => e,
        }
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Emails are stored and compared lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_minutes: i64,
}

impl TokenCodec {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            access_ttl_minutes: settings.access_token_expiry_minutes,
        }
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.access_ttl_minutes * 60
    }

    pub fn issue(&self, user_id: i64, role: UserRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: (now + Duration::minutes(self.access_ttl_minutes)).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Hash refresh token for storage
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn new_refresh_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// AuthService implementation
pub struct AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    id_generator: Arc<SnowflakeGenerator>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenCodec,
    refresh_ttl_days: i64,
}

impl<U, S> AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        id_generator: Arc<SnowflakeGenerator>,
        mailer: Arc<dyn Mailer>,
        jwt_settings: &JwtSettings,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            id_generator,
            mailer,
            tokens: TokenCodec::new(jwt_settings),
            refresh_ttl_days: jwt_settings.refresh_token_expiry_days,
        }
    }

    fn refresh_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.refresh_ttl_days)
    }

    fn token_pair(&self, user: &User) -> Result<(AuthTokens, String), AuthError> {
        let refresh_token = new_refresh_token();
        let hash = hash_refresh_token(&refresh_token);

        let tokens = AuthTokens {
            access_token: self.tokens.issue(user.id, user.role)?,
            refresh_token,
            expires_in: self.tokens.expires_in_secs(),
            token_type: "Bearer".to_string(),
        };

        Ok((tokens, hash))
    }

    /// Issue tokens and open a new session for them
    async fn start_session(
        &self,
        user: &User,
        user_agent: Option<String>,
    ) -> Result<AuthTokens, AuthError> {
        let (tokens, hash) = self.token_pair(user)?;

        let mut session = Session::new(user.id, hash, self.refresh_expiry());
        session.user_agent = user_agent;
        self.session_repo.create(&session).await?;

        Ok(tokens)
    }
}

#[async_trait]
impl<U, S> AuthService for AuthServiceImpl<U, S>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn register(&self, account: NewAccount) -> Result<(User, AuthTokens), AuthError> {
        let email = normalize_email(&account.email);

        if self.user_repo.email_exists(&email).await? {
            return Err(AuthError::EmailExists);
        }

        let now = Utc::now();
        let user = User {
            id: self.id_generator.generate(),
            email,
            password_hash: hash_password(&account.password)?,
            full_name: account.full_name.trim().to_string(),
            phone: account.phone,
            role: UserRole::Client,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let created = self.user_repo.create(&user).await?;
        let tokens = self.start_session(&created, None).await?;

        tracing::info!(user_id = created.id, "User registered");

        notify(
            self.mailer.as_ref(),
            &created.email,
            EmailTemplate::Welcome {
                full_name: created.full_name.clone(),
            },
        )
        .await;

        Ok((created, tokens))
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<String>,
    ) -> Result<(User, AuthTokens), AuthError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let tokens = self.start_session(&user, user_agent).await?;
        tracing::debug!(user_id = user.id, "User logged in");

        Ok((user, tokens))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if !session.is_active() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = match self.user_repo.find_by_id(session.user_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                self.session_repo.revoke(session.id).await?;
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        // Rotate: the presented token stops working
        let (tokens, hash) = self.token_pair(&user)?;
        self.session_repo
            .rotate(session.id, &hash, self.refresh_expiry())
            .await?;

        Ok(tokens)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        if let Some(session) = self
            .session_repo
            .find_by_token_hash(&hash_refresh_token(refresh_token))
            .await?
        {
            self.session_repo.revoke(session.id).await?;
        }

        Ok(())
    }

    async fn current_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.current_user(user_id).await?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::WrongPassword);
        }

        self.user_repo
            .update_password(user.id, &hash_password(new_password)?)
            .await?;
        let revoked = self.session_repo.revoke_all_for_user(user.id).await?;

        tracing::info!(user_id = user.id, revoked_sessions = revoked, "Password changed");

        notify(
            self.mailer.as_ref(),
            &user.email,
            EmailTemplate::PasswordChanged {
                full_name: user.full_name.clone(),
            },
        )
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockSessionRepository, MockUserRepository};
    use crate::infrastructure::email::RecordingMailer;
    use mockall::predicate::eq;

    fn jwt() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-that-is-at-least-32-characters".into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn service(
        users: MockUserRepository,
        sessions: MockSessionRepository,
        mailer: Arc<RecordingMailer>,
    ) -> AuthServiceImpl<MockUserRepository, MockSessionRepository> {
        AuthServiceImpl::new(
            Arc::new(users),
            Arc::new(sessions),
            Arc::new(SnowflakeGenerator::new(1)),
            mailer,
            &jwt(),
        )
    }

    fn stored_user(password: &str, is_active: bool) -> User {
        User {
            id: 7,
            email: "jane@example.com".into(),
            password_hash: hash_password(password).unwrap(),
            full_name: "Jane".into(),
            role: UserRole::Therapist,
            is_active,
            ..User::default()
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_token_codec_carries_role() {
        let codec = TokenCodec::new(&jwt());
        let token = codec.issue(42, UserRole::Affiliate).unwrap();
        let claims = codec.decode(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.role, UserRole::Affiliate);
    }

    #[test]
    fn test_token_codec_rejects_other_secret() {
        let token = TokenCodec::new(&jwt()).issue(1, UserRole::Client).unwrap();
        let other = JwtSettings {
            secret: "another-secret-that-is-at-least-32-chars".into(),
            ..jwt()
        };

        assert!(matches!(
            TokenCodec::new(&other).decode(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_sends_welcome() {
        let mut users = MockUserRepository::new();
        users
            .expect_email_exists()
            .with(eq("new@example.com"))
            .returning(|_| Ok(false));
        users.expect_create().returning(|u| Ok(u.clone()));

        let mut sessions = MockSessionRepository::new();
        sessions.expect_create().times(1).returning(|s| Ok(s.clone()));

        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(users, sessions, mailer.clone());

        let (user, tokens) = svc
            .register(NewAccount {
                email: "  New@Example.com ".into(),
                password: "password123".into(),
                full_name: "New User".into(),
                phone: None,
            })
            .await
            .unwrap();

        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.role, UserRole::Client);
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.refresh_token.len(), REFRESH_TOKEN_LEN);
        assert_eq!(mailer.kinds(), vec!["welcome"]);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().returning(|_| Ok(true));

        let svc = service(users, MockSessionRepository::new(), Arc::default());
        let result = svc
            .register(NewAccount {
                email: "taken@example.com".into(),
                password: "password123".into(),
                full_name: "Dup".into(),
                phone: None,
            })
            .await;

        assert!(matches!(result, Err(AuthError::EmailExists)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = stored_user("right-password", true);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let svc = service(users, MockSessionRepository::new(), Arc::default());
        let result = svc.login("jane@example.com", "wrong-password", None).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_deactivated_account() {
        let user = stored_user("right-password", false);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let svc = service(users, MockSessionRepository::new(), Arc::default());
        let result = svc.login("jane@example.com", "right-password", None).await;

        assert!(matches!(result, Err(AuthError::AccountDisabled)));
    }

    #[tokio::test]
    async fn test_login_issues_role_token() {
        let user = stored_user("right-password", true);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_create()
            .withf(|s| s.user_agent.as_deref() == Some("curl/8"))
            .returning(|s| Ok(s.clone()));

        let svc = service(users, sessions, Arc::default());
        let (_, tokens) = svc
            .login("JANE@example.com", "right-password", Some("curl/8".into()))
            .await
            .unwrap();

        let claims = TokenCodec::new(&jwt()).decode(&tokens.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Therapist);
    }

    #[tokio::test]
    async fn test_refresh_rejects_revoked_session() {
        let mut session = Session::new(7, "hash".into(), Utc::now() + Duration::days(1));
        session.revoked_at = Some(Utc::now());

        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_find_by_token_hash()
            .returning(move |_| Ok(Some(session.clone())));

        let svc = service(MockUserRepository::new(), sessions, Arc::default());
        assert!(matches!(
            svc.refresh("whatever").await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let presented = "presented-token";
        let session = Session::new(
            7,
            hash_refresh_token(presented),
            Utc::now() + Duration::days(1),
        );
        let session_id = session.id;
        let user = stored_user("pw-irrelevant", true);

        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_find_by_token_hash()
            .with(eq(hash_refresh_token(presented)))
            .returning(move |_| Ok(Some(session.clone())));
        sessions
            .expect_rotate()
            .withf(move |id, hash, _| *id == session_id && hash != hash_refresh_token(presented))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .with(eq(7))
            .returning(move |_| Ok(Some(user.clone())));

        let svc = service(users, sessions, Arc::default());
        let tokens = svc.refresh(presented).await.unwrap();
        assert_ne!(tokens.refresh_token, presented);
    }

    #[tokio::test]
    async fn test_logout_unknown_token_is_ok() {
        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(|_| Ok(None));
        sessions.expect_revoke().never();

        let svc = service(MockUserRepository::new(), sessions, Arc::default());
        assert!(svc.logout("unknown").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_revokes_sessions() {
        let user = stored_user("old-password", true);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_update_password()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_revoke_all_for_user()
            .with(eq(7))
            .times(1)
            .returning(|_| Ok(3));

        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(users, sessions, mailer.clone());
        svc.change_password(7, "old-password", "new-password")
            .await
            .unwrap();

        assert_eq!(mailer.kinds(), vec!["password_changed"]);
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let user = stored_user("old-password", true);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_update_password().never();

        let svc = service(users, MockSessionRepository::new(), Arc::default());
        let result = svc.change_password(7, "nope", "new-password").await;

        assert!(matches!(result, Err(AuthError::WrongPassword)));
    }
}
