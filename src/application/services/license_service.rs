//! License Service
//!
//! Serial-key licenses: batch issue, activation by users, public
//! validation and revocation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::codes::{generate_serial_key, normalize_code, MAX_CODE_ATTEMPTS};
use crate::domain::{Actor, License, LicenseRepository, LicenseStatus, Page, PageRequest};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

pub const MAX_ISSUE_QUANTITY: u32 = 50;
pub const MAX_EXPIRY_DAYS: i64 = 36_500;

#[async_trait]
pub trait LicenseService: Send + Sync {
    /// Generate `quantity` new licenses (admin only)
    async fn issue(
        &self,
        actor: Actor,
        quantity: u32,
        expires_in_days: Option<i64>,
    ) -> Result<Vec<License>, LicenseError>;

    async fn list_licenses(
        &self,
        actor: Actor,
        status: Option<LicenseStatus>,
        page: PageRequest,
    ) -> Result<Page<License>, LicenseError>;

    /// Bind a license to the caller
    async fn activate(&self, actor: Actor, serial_key: &str) -> Result<License, LicenseError>;

    /// Public validity check
    async fn validate(&self, serial_key: &str) -> Result<LicenseCheck, LicenseError>;

    async fn revoke(&self, actor: Actor, license_id: i64) -> Result<(), LicenseError>;
}

/// Result of a public validity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseCheck {
    pub valid: bool,
    pub status: Option<LicenseStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    #[error("License not found")]
    NotFound,

    #[error("Quantity must be between 1 and 50")]
    InvalidQuantity,

    #[error("Expiry must be between 1 and 36500 days")]
    InvalidExpiry,

    #[error("License has been revoked")]
    Revoked,

    #[error("License has expired")]
    Expired,

    #[error("License is already activated by another user")]
    AlreadyActivated,

    #[error("Could not generate a unique serial key")]
    KeyExhausted,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<LicenseError> for AppError {
    fn from(e: LicenseError) -> Self {
        let message = e.to_string();
        match e {
            LicenseError::NotFound => AppError::NotFound(message),
            LicenseError::InvalidQuantity => AppError::invalid_field("quantity", message),
            LicenseError::InvalidExpiry => AppError::invalid_field("expires_in_days", message),
            LicenseError::Expired => AppError::BadRequest(message),
            LicenseError::Revoked | LicenseError::AlreadyActivated => AppError::Conflict(message),
            LicenseError::KeyExhausted => AppError::Internal(message),
            LicenseError::Forbidden(msg) => AppError::Forbidden(msg.into()),
            LicenseError::Store(e) => e,
        }
    }
}

pub struct LicenseServiceImpl<L>
where
    L: LicenseRepository,
{
    license_repo: Arc<L>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<L> LicenseServiceImpl<L>
where
    L: LicenseRepository,
{
    pub fn new(license_repo: Arc<L>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            license_repo,
            id_generator,
        }
    }

    async fn unused_key(&self) -> Result<String, LicenseError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let key = generate_serial_key();
            if !self.license_repo.serial_key_exists(&key).await? {
                return Ok(key);
            }
        }
        Err(LicenseError::KeyExhausted)
    }
}

/// `now + days`, or `None` when `days` is outside 1..=MAX_EXPIRY_DAYS
fn expiry_after(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    if !(1..=MAX_EXPIRY_DAYS).contains(&days) {
        return None;
    }
    now.checked_add_signed(TimeDelta::try_days(days)?)
}

#[async_trait]
impl<L> LicenseService for LicenseServiceImpl<L>
where
    L: LicenseRepository + 'static,
{
    async fn issue(
        &self,
        actor: Actor,
        quantity: u32,
        expires_in_days: Option<i64>,
    ) -> Result<Vec<License>, LicenseError> {
        if !actor.is_admin() {
            return Err(LicenseError::Forbidden("Admin access required"));
        }
        if !(1..=MAX_ISSUE_QUANTITY).contains(&quantity) {
            return Err(LicenseError::InvalidQuantity);
        }
        let now = Utc::now();
        let expires_at = match expires_in_days {
            Some(days) => Some(expiry_after(now, days).ok_or(LicenseError::InvalidExpiry)?),
            None => None,
        };
        let mut issued = Vec::with_capacity(quantity as usize);

        for _ in 0..quantity {
            let license = License {
                id: self.id_generator.generate(),
                serial_key: self.unused_key().await?,
                user_id: None,
                status: LicenseStatus::Available,
                expires_at,
                activated_at: None,
                created_at: now,
                updated_at: now,
            };
            issued.push(self.license_repo.create(&license).await?);
        }

        tracing::info!(count = issued.len(), by = actor.user_id, "Licenses issued");
        Ok(issued)
    }

    async fn list_licenses(
        &self,
        actor: Actor,
        status: Option<LicenseStatus>,
        page: PageRequest,
    ) -> Result<Page<License>, LicenseError> {
        if !actor.is_admin() {
            return Err(LicenseError::Forbidden("Admin access required"));
        }

        Ok(self.license_repo.list(status, page).await?)
    }

    async fn activate(&self, actor: Actor, serial_key: &str) -> Result<License, LicenseError> {
        let license = self
            .license_repo
            .find_by_serial_key(&normalize_code(serial_key))
            .await?
            .ok_or(LicenseError::NotFound)?;

        match license.status {
            LicenseStatus::Revoked => return Err(LicenseError::Revoked),
            LicenseStatus::Active if license.user_id == Some(actor.user_id) => {
                return Ok(license)
            }
            LicenseStatus::Active => return Err(LicenseError::AlreadyActivated),
            LicenseStatus::Available => {}
        }

        if license.is_expired_at(Utc::now()) {
            return Err(LicenseError::Expired);
        }

        let activated = self
            .license_repo
            .activate(license.id, actor.user_id)
            .await?
            .ok_or(LicenseError::AlreadyActivated)?;

        tracing::info!(license_id = activated.id, user_id = actor.user_id, "License activated");
        Ok(activated)
    }

    async fn validate(&self, serial_key: &str) -> Result<LicenseCheck, LicenseError> {
        let check = match self
            .license_repo
            .find_by_serial_key(&normalize_code(serial_key))
            .await?
        {
            Some(license) => LicenseCheck {
                valid: license.is_valid_at(Utc::now()),
                status: Some(license.status),
                expires_at: license.expires_at,
            },
            None => LicenseCheck {
                valid: false,
                status: None,
                expires_at: None,
            },
        };

        Ok(check)
    }

    async fn revoke(&self, actor: Actor, license_id: i64) -> Result<(), LicenseError> {
        if !actor.is_admin() {
            return Err(LicenseError::Forbidden("Admin access required"));
        }

        self.license_repo
            .find_by_id(license_id)
            .await?
            .ok_or(LicenseError::NotFound)?;
        self.license_repo.revoke(license_id).await?;

        tracing::info!(license_id, by = actor.user_id, "License revoked");
        Ok(())
    }
}
