//! User Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::page_request;
use crate::application::dto::request::{UpdateUserRequest, UserListQuery};
use crate::application::dto::response::{Paginated, UserResponse};
use crate::application::services::{UserService, UserServiceImpl, UserUpdate};
use crate::domain::UserFilter;
use crate::infrastructure::repositories::{PgSessionRepository, PgUserRepository};
use crate::presentation::http::extractors::{ApiQuery, ValidJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn user_service(state: &AppState) -> UserServiceImpl<PgUserRepository, PgSessionRepository> {
    UserServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgSessionRepository::new(state.db.clone())),
    )
}

/// List users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    let page = page_request(&state, query.page, query.limit);
    let filter = UserFilter {
        role: query.role,
        is_active: query.is_active,
        search: query.search,
    };

    let users = user_service(&state)
        .list_users(auth.actor(), filter, page)
        .await?;

    Ok(Json(Paginated::from_page(users, UserResponse::from)))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = AppError::parse_id(&user_id, "user")?;
    let user = user_service(&state).get_user(auth.actor(), user_id).await?;
    Ok(Json(user.into()))
}

/// Update a user's profile
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    ValidJson(body): ValidJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = AppError::parse_id(&user_id, "user")?;
    let update = UserUpdate {
        full_name: body.full_name,
        phone: body.phone,
        role: body.role,
        is_active: body.is_active,
    };

    let user = user_service(&state)
        .update_user(auth.actor(), user_id, update)
        .await?;

    Ok(Json(user.into()))
}

/// Deactivate a user (admin)
pub async fn deactivate_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user_id = AppError::parse_id(&user_id, "user")?;
    user_service(&state)
        .deactivate_user(auth.actor(), user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
