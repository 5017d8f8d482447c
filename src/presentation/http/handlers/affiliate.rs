//! Affiliate Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{page_request, parse_opt_id};
use crate::application::dto::request::{
    AffiliateListQuery, CreateAffiliateRequest, UpdateAffiliateRequest,
};
use crate::application::dto::response::{
    AffiliateDetailResponse, AffiliateResponse, Paginated, ReferralCodeResponse,
};
use crate::application::services::{
    AffiliateService, AffiliateServiceImpl, AffiliateUpdate, NewAffiliate,
};
use crate::infrastructure::repositories::{PgAffiliateRepository, PgUserRepository};
use crate::presentation::http::extractors::{ApiQuery, ValidJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn affiliate_service(
    state: &AppState,
) -> AffiliateServiceImpl<PgAffiliateRepository, PgUserRepository> {
    AffiliateServiceImpl::new(
        Arc::new(PgAffiliateRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.snowflake.clone(),
        state.settings.affiliate.default_commission_rate,
    )
}

/// Enroll a user as an affiliate
pub async fn create_affiliate(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateAffiliateRequest>,
) -> Result<(StatusCode, Json<AffiliateResponse>), AppError> {
    let input = NewAffiliate {
        user_id: parse_opt_id(body.user_id.as_deref(), "user")?,
        commission_rate: body.commission_rate,
    };

    let affiliate = affiliate_service(&state)
        .create_affiliate(auth.actor(), input)
        .await?;

    Ok((StatusCode::CREATED, Json(affiliate.into())))
}

/// List affiliates (admin)
pub async fn list_affiliates(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<AffiliateListQuery>,
) -> Result<Json<Paginated<AffiliateResponse>>, AppError> {
    let page = page_request(&state, query.page, query.limit);
    let affiliates = affiliate_service(&state)
        .list_affiliates(auth.actor(), query.status, page)
        .await?;

    Ok(Json(Paginated::from_page(affiliates, AffiliateResponse::from)))
}

/// The caller's affiliate profile
pub async fn my_affiliate(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<AffiliateResponse>, AppError> {
    let affiliate = affiliate_service(&state).my_affiliate(auth.actor()).await?;
    Ok(Json(affiliate.into()))
}

/// Check a referral code (public)
pub async fn validate_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ReferralCodeResponse>, AppError> {
    let (valid, referral_code) = affiliate_service(&state).validate_code(&code).await?;
    Ok(Json(ReferralCodeResponse {
        valid,
        referral_code,
    }))
}

/// Affiliate with stats (admin or owner)
pub async fn get_affiliate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(affiliate_id): Path<String>,
) -> Result<Json<AffiliateDetailResponse>, AppError> {
    let affiliate_id = AppError::parse_id(&affiliate_id, "affiliate")?;
    let (affiliate, stats) = affiliate_service(&state)
        .get_affiliate(auth.actor(), affiliate_id)
        .await?;

    Ok(Json(AffiliateDetailResponse::new(affiliate, stats)))
}

/// Update rate or status (admin)
pub async fn update_affiliate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(affiliate_id): Path<String>,
    ValidJson(body): ValidJson<UpdateAffiliateRequest>,
) -> Result<Json<AffiliateResponse>, AppError> {
    let affiliate_id = AppError::parse_id(&affiliate_id, "affiliate")?;
    let update = AffiliateUpdate {
        commission_rate: body.commission_rate,
        status: body.status,
    };

    let affiliate = affiliate_service(&state)
        .update_affiliate(auth.actor(), affiliate_id, update)
        .await?;

    Ok(Json(affiliate.into()))
}

/// Deactivate an affiliate (admin)
pub async fn deactivate_affiliate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(affiliate_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let affiliate_id = AppError::parse_id(&affiliate_id, "affiliate")?;
    affiliate_service(&state)
        .deactivate_affiliate(auth.actor(), affiliate_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
