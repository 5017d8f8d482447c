//! Commission Service
//!
//! Commission ledgers for admins and affiliates, and the admin-driven
//! approve / pay / cancel workflow.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Actor, AffiliateRepository, Commission, CommissionFilter, CommissionRepository,
    CommissionStatus, CommissionTotal, Page, PageRequest,
};
use crate::shared::error::AppError;

#[async_trait]
pub trait CommissionService: Send + Sync {
    /// Admins see everything; affiliates only their own
    async fn list_commissions(
        &self,
        actor: Actor,
        filter: CommissionFilter,
        page: PageRequest,
    ) -> Result<Page<Commission>, CommissionError>;

    /// Count and sum per status
    async fn summary(&self, actor: Actor) -> Result<Vec<CommissionTotal>, CommissionError>;

    async fn get_commission(
        &self,
        actor: Actor,
        commission_id: i64,
    ) -> Result<Commission, CommissionError>;

    /// Move a commission along its workflow (admin only)
    async fn update_status(
        &self,
        actor: Actor,
        commission_id: i64,
        status: CommissionStatus,
    ) -> Result<Commission, CommissionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CommissionError {
    #[error("Commission not found")]
    NotFound,

    #[error("No affiliate profile for this account")]
    NoAffiliateProfile,

    #[error("Commission is already {0}")]
    Terminal(CommissionStatus),

    #[error("Cannot change commission from {from} to {to}")]
    InvalidTransition {
        from: CommissionStatus,
        to: CommissionStatus,
    },

    #[error("Commission was changed by another request")]
    Changed,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<CommissionError> for AppError {
    fn from(e: CommissionError) -> Self {
        match e {
            CommissionError::NotFound => AppError::NotFound("Commission not found".into()),
            CommissionError::NoAffiliateProfile => {
                AppError::Forbidden("No affiliate profile for this account".into())
            }
            CommissionError::Terminal(status) => {
                AppError::Conflict(format!("Commission is already {}", status))
            }
            CommissionError::InvalidTransition { from, to } => AppError::invalid_field(
                "status",
                format!("Cannot change commission from {} to {}", from, to),
            ),
            CommissionError::Changed => {
                AppError::Conflict("Commission was changed by another request".into())
            }
            CommissionError::Forbidden(msg) => AppError::Forbidden(msg.into()),
            CommissionError::Store(e) => e,
        }
    }
}

/// Check an admin status change against the workflow.
pub fn check_transition(
    from: CommissionStatus,
    to: CommissionStatus,
) -> Result<(), CommissionError> {
    if from.is_terminal() {
        return Err(CommissionError::Terminal(from));
    }
    if !from.can_transition_to(to) {
        return Err(CommissionError::InvalidTransition { from, to });
    }
    Ok(())
}

pub struct CommissionServiceImpl<C, A>
where
    C: CommissionRepository,
    A: AffiliateRepository,
{
    commission_repo: Arc<C>,
    affiliate_repo: Arc<A>,
}

impl<C, A> CommissionServiceImpl<C, A>
where
    C: CommissionRepository,
    A: AffiliateRepository,
{
    pub fn new(commission_repo: Arc<C>, affiliate_repo: Arc<A>) -> Self {
        Self {
            commission_repo,
            affiliate_repo,
        }
    }

    /// `None` for admins, the actor's affiliate ID otherwise
    async fn scope(&self, actor: Actor) -> Result<Option<i64>, CommissionError> {
        if actor.is_admin() {
            return Ok(None);
        }

        let affiliate = self
            .affiliate_repo
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or(CommissionError::NoAffiliateProfile)?;

        Ok(Some(affiliate.id))
    }
}

#[async_trait]
impl<C, A> CommissionService for CommissionServiceImpl<C, A>
where
    C: CommissionRepository + 'static,
    A: AffiliateRepository + 'static,
{
    async fn list_commissions(
        &self,
        actor: Actor,
        mut filter: CommissionFilter,
        page: PageRequest,
    ) -> Result<Page<Commission>, CommissionError> {
        if let Some(own) = self.scope(actor).await? {
            filter.affiliate_id = Some(own);
        }

        Ok(self.commission_repo.list(&filter, page).await?)
    }

    async fn summary(&self, actor: Actor) -> Result<Vec<CommissionTotal>, CommissionError> {
        let scope = self.scope(actor).await?;
        Ok(self.commission_repo.totals(scope).await?)
    }

    async fn get_commission(
        &self,
        actor: Actor,
        commission_id: i64,
    ) -> Result<Commission, CommissionError> {
        let commission = self
            .commission_repo
            .find_by_id(commission_id)
            .await?
            .ok_or(CommissionError::NotFound)?;

        match self.scope(actor).await? {
            Some(own) if own != commission.affiliate_id => Err(CommissionError::Forbidden(
                "You can only view your own commissions",
            )),
            _ => Ok(commission),
        }
    }

    async fn update_status(
        &self,
        actor: Actor,
        commission_id: i64,
        status: CommissionStatus,
    ) -> Result<Commission, CommissionError> {
        if !actor.is_admin() {
            return Err(CommissionError::Forbidden("Admin access required"));
        }

        let current = self
            .commission_repo
            .find_by_id(commission_id)
            .await?
            .ok_or(CommissionError::NotFound)?;

        check_transition(current.status, status)?;

        let paid_at = (status == CommissionStatus::Paid).then(Utc::now);
        let Some(updated) = self
            .commission_repo
            .update_status(commission_id, current.status, status, paid_at)
            .await?
        else {
            // Status moved underneath us; report against what is stored now
            let latest = self
                .commission_repo
                .find_by_id(commission_id)
                .await?
                .ok_or(CommissionError::NotFound)?;
            check_transition(latest.status, status)?;
            return Err(CommissionError::Changed);
        };

        tracing::info!(
            commission_id,
            from = %current.status,
            to = %status,
            by = actor.user_id,
            "Commission status updated"
        );

        Ok(updated)
    }
}
