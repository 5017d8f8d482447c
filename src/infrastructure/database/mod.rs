//! Database Module
//!
//! PostgreSQL connection pool, migrations and first-start seeding.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::application::services::auth_service::{hash_password, normalize_email};
use crate::config::{BootstrapSettings, DatabaseSettings};
use crate::domain::{User, UserRepository, UserRole};
use crate::infrastructure::repositories::PgUserRepository;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Create a PostgreSQL connection pool
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Create the configured admin account if it does not exist yet.
///
/// Returns `true` when an account was created.
pub async fn bootstrap_admin(
    pool: &PgPool,
    settings: &BootstrapSettings,
    snowflake: &SnowflakeGenerator,
) -> Result<bool, AppError> {
    let (Some(email), Some(password)) = (&settings.admin_email, &settings.admin_password) else {
        return Ok(false);
    };

    let users = PgUserRepository::new(pool.clone());
    let email = normalize_email(email);
    if users.email_exists(&email).await? {
        tracing::debug!(email = %email, "Admin account already present");
        return Ok(false);
    }

    let admin = User {
        id: snowflake.generate(),
        email,
        password_hash: hash_password(password)?,
        full_name: settings
            .admin_full_name
            .clone()
            .unwrap_or_else(|| "Administrator".to_string()),
        role: UserRole::Admin,
        ..User::default()
    };
    let admin = users.create(&admin).await?;

    tracing::info!(user_id = admin.id, email = %admin.email, "Bootstrap admin created");
    Ok(true)
}
