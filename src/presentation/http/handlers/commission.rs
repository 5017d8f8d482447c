//! Commission Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::{page_request, parse_opt_id};
use crate::application::dto::request::{CommissionListQuery, UpdateCommissionStatusRequest};
use crate::application::dto::response::{
    CommissionResponse, CommissionSummaryResponse, Paginated,
};
use crate::application::services::{CommissionService, CommissionServiceImpl};
use crate::domain::CommissionFilter;
use crate::infrastructure::repositories::{PgAffiliateRepository, PgCommissionRepository};
use crate::presentation::http::extractors::{ApiJson, ApiQuery};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn commission_service(
    state: &AppState,
) -> CommissionServiceImpl<PgCommissionRepository, PgAffiliateRepository> {
    CommissionServiceImpl::new(
        Arc::new(PgCommissionRepository::new(state.db.clone())),
        Arc::new(PgAffiliateRepository::new(state.db.clone())),
    )
}

/// List commissions (admin: all, affiliate: own)
pub async fn list_commissions(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<CommissionListQuery>,
) -> Result<Json<Paginated<CommissionResponse>>, AppError> {
    let page = page_request(&state, query.page, query.limit);
    let filter = CommissionFilter {
        status: query.status,
        affiliate_id: parse_opt_id(query.affiliate_id.as_deref(), "affiliate")?,
    };

    let commissions = commission_service(&state)
        .list_commissions(auth.actor(), filter, page)
        .await?;

    Ok(Json(Paginated::from_page(commissions, CommissionResponse::from)))
}

/// Count and sum per status
pub async fn commission_summary(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CommissionSummaryResponse>, AppError> {
    let totals = commission_service(&state).summary(auth.actor()).await?;
    Ok(Json(totals.into()))
}

pub async fn get_commission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(commission_id): Path<String>,
) -> Result<Json<CommissionResponse>, AppError> {
    let commission_id = AppError::parse_id(&commission_id, "commission")?;
    let commission = commission_service(&state)
        .get_commission(auth.actor(), commission_id)
        .await?;
    Ok(Json(commission.into()))
}

/// Move a commission along its workflow (admin)
pub async fn update_commission_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(commission_id): Path<String>,
    ApiJson(body): ApiJson<UpdateCommissionStatusRequest>,
) -> Result<Json<CommissionResponse>, AppError> {
    let commission_id = AppError::parse_id(&commission_id, "commission")?;
    let commission = commission_service(&state)
        .update_status(auth.actor(), commission_id, body.status)
        .await?;
    Ok(Json(commission.into()))
}
