//! Therapist Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::booking::booking_service;
use super::page_request;
use super::service::catalog_service;
use crate::application::dto::request::{
    AvailabilityQuery, CreateTherapistRequest, PageQuery, TherapistListQuery,
    UpdateTherapistRequest,
};
use crate::application::dto::response::{
    AvailabilityResponse, Paginated, ServiceResponse, SlotResponse, TherapistResponse,
};
use crate::application::services::{
    BookingService, CatalogService, NewTherapist, TherapistService, TherapistServiceImpl,
    TherapistUpdate,
};
use crate::domain::TherapistFilter;
use crate::infrastructure::repositories::{PgTherapistRepository, PgUserRepository};
use crate::presentation::http::extractors::{ApiQuery, MaybeAuthUser, ValidJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn therapist_service(
    state: &AppState,
) -> TherapistServiceImpl<PgTherapistRepository, PgUserRepository> {
    TherapistServiceImpl::new(
        Arc::new(PgTherapistRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.snowflake.clone(),
    )
}

/// Create a therapist profile (admin)
pub async fn create_therapist(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateTherapistRequest>,
) -> Result<(StatusCode, Json<TherapistResponse>), AppError> {
    let input = NewTherapist {
        user_id: AppError::parse_id(&body.user_id, "user")?,
        specialization: body.specialization,
        bio: body.bio,
        license_number: body.license_number,
    };

    let therapist = therapist_service(&state)
        .create_therapist(auth.actor(), input)
        .await?;

    Ok((StatusCode::CREATED, Json(therapist.into())))
}

/// List therapists (public)
pub async fn list_therapists(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    ApiQuery(query): ApiQuery<TherapistListQuery>,
) -> Result<Json<Paginated<TherapistResponse>>, AppError> {
    let page = page_request(&state, query.page, query.limit);
    let filter = TherapistFilter {
        specialization: query.specialization,
        include_inactive: query.include_inactive,
    };

    let therapists = therapist_service(&state)
        .list_therapists(caller.actor(), filter, page)
        .await?;

    Ok(Json(Paginated::from_page(therapists, TherapistResponse::from)))
}

/// Get a therapist (public)
pub async fn get_therapist(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Path(therapist_id): Path<String>,
) -> Result<Json<TherapistResponse>, AppError> {
    let therapist_id = AppError::parse_id(&therapist_id, "therapist")?;
    let therapist = therapist_service(&state)
        .get_therapist(caller.actor(), therapist_id)
        .await?;
    Ok(Json(therapist.into()))
}

/// Active services of a therapist (public)
pub async fn therapist_services(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Paginated<ServiceResponse>>, AppError> {
    let therapist_id = AppError::parse_id(&therapist_id, "therapist")?;
    let page = page_request(&state, query.page, query.limit);

    let services = catalog_service(&state)
        .therapist_services(therapist_id, page)
        .await?;

    Ok(Json(Paginated::from_page(services, ServiceResponse::from)))
}

/// Booked slots of a therapist on a date (public)
pub async fn availability(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let id = AppError::parse_id(&therapist_id, "therapist")?;
    let slots = booking_service(&state).availability(id, query.date).await?;

    Ok(Json(AvailabilityResponse {
        therapist_id: id.to_string(),
        date: query.date,
        booked_slots: slots.into_iter().map(SlotResponse::from).collect(),
    }))
}

/// Update a therapist profile (admin or owner)
pub async fn update_therapist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(therapist_id): Path<String>,
    ValidJson(body): ValidJson<UpdateTherapistRequest>,
) -> Result<Json<TherapistResponse>, AppError> {
    let therapist_id = AppError::parse_id(&therapist_id, "therapist")?;
    let update = TherapistUpdate {
        specialization: body.specialization,
        bio: body.bio,
        license_number: body.license_number,
        is_active: body.is_active,
    };

    let therapist = therapist_service(&state)
        .update_therapist(auth.actor(), therapist_id, update)
        .await?;

    Ok(Json(therapist.into()))
}

/// Deactivate a therapist (admin)
pub async fn deactivate_therapist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(therapist_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let therapist_id = AppError::parse_id(&therapist_id, "therapist")?;
    therapist_service(&state)
        .deactivate_therapist(auth.actor(), therapist_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
