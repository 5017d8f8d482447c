//! Service Catalog Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{page_request, parse_opt_id};
use crate::application::dto::request::{
    CreateServiceRequest, ServiceListQuery, UpdateServiceRequest,
};
use crate::application::dto::response::{Paginated, ServiceResponse};
use crate::application::services::{CatalogService, CatalogServiceImpl, NewService, ServiceUpdate};
use crate::infrastructure::repositories::{PgServiceRepository, PgTherapistRepository};
use crate::presentation::http::extractors::{ApiQuery, MaybeAuthUser, ValidJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

pub(super) fn catalog_service(
    state: &AppState,
) -> CatalogServiceImpl<PgServiceRepository, PgTherapistRepository> {
    CatalogServiceImpl::new(
        Arc::new(PgServiceRepository::new(state.db.clone())),
        Arc::new(PgTherapistRepository::new(state.db.clone())),
        state.snowflake.clone(),
    )
}

/// Create a service (admin or therapist)
pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>), AppError> {
    let input = NewService {
        therapist_id: parse_opt_id(body.therapist_id.as_deref(), "therapist")?,
        name: body.name,
        description: body.description,
        duration_minutes: body.duration_minutes,
        price: body.price,
    };

    let service = catalog_service(&state)
        .create_service(auth.actor(), input)
        .await?;

    Ok((StatusCode::CREATED, Json(service.into())))
}

/// List active services (public)
pub async fn list_services(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ServiceListQuery>,
) -> Result<Json<Paginated<ServiceResponse>>, AppError> {
    let page = page_request(&state, query.page, query.limit);
    let therapist_id = parse_opt_id(query.therapist_id.as_deref(), "therapist")?;

    let services = catalog_service(&state)
        .list_services(therapist_id, page)
        .await?;

    Ok(Json(Paginated::from_page(services, ServiceResponse::from)))
}

/// Get a service (public; inactive ones only for admins and the owner)
pub async fn get_service(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Path(service_id): Path<String>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service_id = AppError::parse_id(&service_id, "service")?;
    let service = catalog_service(&state)
        .get_service(caller.actor(), service_id)
        .await?;
    Ok(Json(service.into()))
}

/// Update a service (admin or owning therapist)
pub async fn update_service(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(service_id): Path<String>,
    ValidJson(body): ValidJson<UpdateServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service_id = AppError::parse_id(&service_id, "service")?;
    let update = ServiceUpdate {
        name: body.name,
        description: body.description,
        duration_minutes: body.duration_minutes,
        price: body.price,
        is_active: body.is_active,
    };

    let service = catalog_service(&state)
        .update_service(auth.actor(), service_id, update)
        .await?;

    Ok(Json(service.into()))
}

/// Deactivate a service (admin or owning therapist)
pub async fn deactivate_service(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(service_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let service_id = AppError::parse_id(&service_id, "service")?;
    catalog_service(&state)
        .deactivate_service(auth.actor(), service_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
