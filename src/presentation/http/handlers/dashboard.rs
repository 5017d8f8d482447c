//! Dashboard Handler

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::application::dto::response::DashboardResponse;
use crate::application::services::{DashboardService, DashboardServiceImpl};
use crate::infrastructure::repositories::{
    PgAffiliateRepository, PgDashboardRepository, PgTherapistRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Figures scoped to the caller's role
pub async fn overview(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let service = DashboardServiceImpl::new(
        Arc::new(PgDashboardRepository::new(state.db.clone())),
        Arc::new(PgTherapistRepository::new(state.db.clone())),
        Arc::new(PgAffiliateRepository::new(state.db.clone())),
    );

    let dashboard = service.overview(auth.actor()).await?;
    Ok(Json(dashboard.into()))
}
