//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest};
use crate::shared::error::AppError;

/// User role enum matching the `users.role` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Therapist,
    Affiliate,
    #[default]
    Client,
}

impl UserRole {
    /// Strict parse for client input.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "therapist" => Some(Self::Therapist),
            "affiliate" => Some(Self::Affiliate),
            "client" => Some(Self::Client),
            _ => None,
        }
    }

    /// Convert from database string representation.
    pub fn from_db(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Therapist => "therapist",
            Self::Affiliate => "affiliate",
            Self::Client => "client",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents an account.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - password_hash: VARCHAR(255) NOT NULL
/// - full_name: VARCHAR(100) NOT NULL
/// - phone: VARCHAR(32) NULL
/// - role: VARCHAR(20) NOT NULL DEFAULT 'client'
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Stored lower-cased
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: String,

    pub phone: Option<String>,

    #[serde(default)]
    pub role: UserRole,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email: String::new(),
            password_hash: String::new(),
            full_name: String::new(),
            phone: None,
            role: UserRole::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring of email or full name
    pub search: Option<String>,
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual database interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find a user by their (lower-cased) email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Page through users matching a filter, newest first.
    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, AppError>;

    /// Create a new user in the database.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Persist profile fields, role and active flag.
    async fn update(&self, user: &User) -> Result<User, AppError>;

    /// Replace the stored password hash.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError>;

    /// Soft-deactivate a user.
    async fn deactivate(&self, id: i64) -> Result<(), AppError>;

    /// Check if an email address is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;
}
