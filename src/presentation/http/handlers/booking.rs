//! Booking Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{page_request, parse_opt_id};
use crate::application::dto::request::{
    BookingListQuery, CreateBookingRequest, UpdateBookingStatusRequest,
};
use crate::application::dto::response::{BookingResponse, Paginated, PlacedBookingResponse};
use crate::application::services::{BookingService, BookingServiceImpl, NewBooking};
use crate::domain::BookingFilter;
use crate::infrastructure::repositories::{
    PgAffiliateRepository, PgBookingRepository, PgTherapistRepository,
};
use crate::presentation::http::extractors::{ApiJson, ApiQuery, MaybeAuthUser, ValidJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

pub(super) fn booking_service(
    state: &AppState,
) -> BookingServiceImpl<PgBookingRepository, PgTherapistRepository, PgAffiliateRepository> {
    BookingServiceImpl::new(
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgTherapistRepository::new(state.db.clone())),
        Arc::new(PgAffiliateRepository::new(state.db.clone())),
        state.snowflake.clone(),
        state.mailer.clone(),
    )
}

/// Place a booking (public; linked to the caller when signed in)
pub async fn create_booking(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    ValidJson(body): ValidJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<PlacedBookingResponse>), AppError> {
    let input = NewBooking {
        service_id: AppError::parse_id(&body.service_id, "service")?,
        booking_date: body.booking_date,
        start_time: body.parse_start_time()?,
        client_name: body.client_name,
        client_email: body.client_email,
        client_phone: body.client_phone,
        notes: body.notes,
        affiliate_code: body.affiliate_code,
    };

    let placed = booking_service(&state)
        .place_booking(caller.actor(), input)
        .await?;

    Ok((StatusCode::CREATED, Json(placed.into())))
}

/// Bookings visible to the caller
pub async fn list_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Result<Json<Paginated<BookingResponse>>, AppError> {
    let page = page_request(&state, query.page, query.limit);
    let filter = BookingFilter {
        status: query.status,
        therapist_id: parse_opt_id(query.therapist_id.as_deref(), "therapist")?,
        date_from: query.date_from,
        date_to: query.date_to,
        ..Default::default()
    };

    let bookings = booking_service(&state)
        .list_bookings(auth.actor(), filter, page)
        .await?;

    Ok(Json(Paginated::from_page(bookings, BookingResponse::from)))
}

/// Get a booking in the caller's scope
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking_id = AppError::parse_id(&booking_id, "booking")?;
    let booking = booking_service(&state)
        .get_booking(auth.actor(), booking_id)
        .await?;
    Ok(Json(booking.into()))
}

/// Change a booking's status
pub async fn update_booking_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booking_id): Path<String>,
    ApiJson(body): ApiJson<UpdateBookingStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking_id = AppError::parse_id(&booking_id, "booking")?;
    let booking = booking_service(&state)
        .update_status(auth.actor(), booking_id, body.status)
        .await?;
    Ok(Json(booking.into()))
}
