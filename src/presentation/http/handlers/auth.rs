//! Authentication Handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};

use crate::application::dto::request::{
    ChangePasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
};
use crate::application::dto::response::{AuthResponse, TokenResponse, UserResponse};
use crate::application::services::{AuthError, AuthService, AuthServiceImpl, NewAccount};
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::{PgSessionRepository, PgUserRepository};
use crate::presentation::http::extractors::ValidJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

const MAX_USER_AGENT_LEN: usize = 255;

fn auth_service(state: &AppState) -> AuthServiceImpl<PgUserRepository, PgSessionRepository> {
    AuthServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgSessionRepository::new(state.db.clone())),
        state.snowflake.clone(),
        state.mailer.clone(),
        &state.settings.jwt,
    )
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect())
}

/// Register a new client account
pub async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (user, tokens) = auth_service(&state)
        .register(NewAccount {
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            phone: body.phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::new(user, tokens))))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let result = auth_service(&state)
        .login(&body.email, &body.password, user_agent(&headers))
        .await;

    match result {
        Ok((user, tokens)) => {
            metrics::record_login("success");
            Ok(Json(AuthResponse::new(user, tokens)))
        }
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials | AuthError::AccountDisabled) {
                metrics::record_login("failure");
            }
            Err(e.into())
        }
    }
}

/// Exchange a refresh token for a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = auth_service(&state).refresh(&body.refresh_token).await?;
    Ok(Json(tokens.into()))
}

/// Logout (revoke refresh token)
pub async fn logout(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RefreshTokenRequest>,
) -> Result<StatusCode, AppError> {
    auth_service(&state).logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current user
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service(&state).current_user(auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Change the caller's password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    auth_service(&state)
        .change_password(auth.user_id, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
