//! License Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::page_request;
use crate::application::dto::request::{
    ActivateLicenseRequest, IssueLicensesRequest, LicenseListQuery,
};
use crate::application::dto::response::{
    LicenseResponse, LicenseValidationResponse, Paginated,
};
use crate::application::services::{LicenseService, LicenseServiceImpl};
use crate::infrastructure::repositories::PgLicenseRepository;
use crate::presentation::http::extractors::{ApiQuery, ValidJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn license_service(state: &AppState) -> LicenseServiceImpl<PgLicenseRepository> {
    LicenseServiceImpl::new(
        Arc::new(PgLicenseRepository::new(state.db.clone())),
        state.snowflake.clone(),
    )
}

/// Issue a batch of licenses (admin)
pub async fn issue_licenses(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<IssueLicensesRequest>,
) -> Result<(StatusCode, Json<Vec<LicenseResponse>>), AppError> {
    let licenses = license_service(&state)
        .issue(auth.actor(), body.quantity, body.expires_in_days)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(licenses.into_iter().map(LicenseResponse::from).collect()),
    ))
}

/// List licenses (admin)
pub async fn list_licenses(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<LicenseListQuery>,
) -> Result<Json<Paginated<LicenseResponse>>, AppError> {
    let page = page_request(&state, query.page, query.limit);
    let licenses = license_service(&state)
        .list_licenses(auth.actor(), query.status, page)
        .await?;

    Ok(Json(Paginated::from_page(licenses, LicenseResponse::from)))
}

/// Bind a license to the caller
pub async fn activate_license(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<ActivateLicenseRequest>,
) -> Result<Json<LicenseResponse>, AppError> {
    let license = license_service(&state)
        .activate(auth.actor(), &body.serial_key)
        .await?;
    Ok(Json(license.into()))
}

/// Public validity check
pub async fn validate_license(
    State(state): State<AppState>,
    Path(serial_key): Path<String>,
) -> Result<Json<LicenseValidationResponse>, AppError> {
    let check = license_service(&state).validate(&serial_key).await?;
    Ok(Json(check.into()))
}

/// Revoke a license (admin)
pub async fn revoke_license(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(license_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let license_id = AppError::parse_id(&license_id, "license")?;
    license_service(&state)
        .revoke(auth.actor(), license_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
