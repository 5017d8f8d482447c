//! Dashboard Service
//!
//! Role-scoped summary figures.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    Actor, AffiliateRepository, BookingBreakdown, BookingScope, CommissionTotal,
    DashboardRepository, PlatformCounts, TherapistRepository, UserRole,
};
use crate::shared::error::AppError;

#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn overview(&self, actor: Actor) -> Result<Dashboard, AppError>;
}

/// What a dashboard shows; sections a role has no access to are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub role: UserRole,
    pub platform: Option<PlatformCounts>,
    pub bookings: BookingBreakdown,
    pub commissions: Option<Vec<CommissionTotal>>,
}

pub struct DashboardServiceImpl<D, T, A>
where
    D: DashboardRepository,
    T: TherapistRepository,
    A: AffiliateRepository,
{
    dashboard_repo: Arc<D>,
    therapist_repo: Arc<T>,
    affiliate_repo: Arc<A>,
}

impl<D, T, A> DashboardServiceImpl<D, T, A>
where
    D: DashboardRepository,
    T: TherapistRepository,
    A: AffiliateRepository,
{
    pub fn new(dashboard_repo: Arc<D>, therapist_repo: Arc<T>, affiliate_repo: Arc<A>) -> Self {
        Self {
            dashboard_repo,
            therapist_repo,
            affiliate_repo,
        }
    }
}

#[async_trait]
impl<D, T, A> DashboardService for DashboardServiceImpl<D, T, A>
where
    D: DashboardRepository + 'static,
    T: TherapistRepository + 'static,
    A: AffiliateRepository + 'static,
{
    async fn overview(&self, actor: Actor) -> Result<Dashboard, AppError> {
        let mut dashboard = Dashboard {
            role: actor.role,
            ..Default::default()
        };

        match actor.role {
            UserRole::Admin => {
                dashboard.platform = Some(self.dashboard_repo.platform_counts().await?);
                dashboard.bookings = self
                    .dashboard_repo
                    .booking_breakdown(BookingScope::All)
                    .await?;
                dashboard.commissions = Some(self.dashboard_repo.commission_totals(None).await?);
            }
            UserRole::Therapist => {
                // Without a profile there is nothing to count
                if let Some(therapist) = self.therapist_repo.find_by_user_id(actor.user_id).await? {
                    dashboard.bookings = self
                        .dashboard_repo
                        .booking_breakdown(BookingScope::Therapist(therapist.id))
                        .await?;
                }
            }
            UserRole::Affiliate => {
                if let Some(affiliate) = self.affiliate_repo.find_by_user_id(actor.user_id).await? {
                    dashboard.bookings = self
                        .dashboard_repo
                        .booking_breakdown(BookingScope::Affiliate(affiliate.id))
                        .await?;
                    dashboard.commissions = Some(
                        self.dashboard_repo
                            .commission_totals(Some(affiliate.id))
                            .await?,
                    );
                }
            }
            UserRole::Client => {
                dashboard.bookings = self
                    .dashboard_repo
                    .booking_breakdown(BookingScope::Client(actor.user_id))
                    .await?;
            }
        }

        Ok(dashboard)
    }
}
