//! Authentication Middleware
//!
//! JWT validation middleware for protected routes.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::application::services::TokenCodec;
use crate::domain::{Actor, UserRole};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: UserRole,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Decode the bearer token of a request, if one is present.
fn authenticate(headers: &HeaderMap, tokens: &TokenCodec) -> Option<Result<AuthUser, AppError>> {
    if !headers.contains_key(axum::http::header::AUTHORIZATION) {
        return None;
    }

    let result = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))
        .and_then(|Authorization(bearer)| {
            let claims = tokens.decode(bearer.token())?;
            let user_id = claims.user_id()?;
            Ok(AuthUser {
                user_id,
                role: claims.role,
            })
        });

    Some(result)
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(request.headers(), &state.tokens)
        .unwrap_or_else(|| Err(AppError::Unauthorized("Missing authorization header".into())))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Optional authentication middleware. Requests without a token pass
/// through anonymously; a token that is present must be valid.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(user) = authenticate(request.headers(), &state.tokens) {
        request.extensions_mut().insert(user?);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtSettings;

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtSettings {
            secret: "0123456789abcdef0123456789abcdef".into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        })
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_no_header_is_anonymous() {
        assert!(authenticate(&HeaderMap::new(), &codec()).is_none());
    }

    #[test]
    fn test_valid_bearer_token() {
        let codec = codec();
        let token = codec.issue(42, UserRole::Therapist).unwrap();

        let user = authenticate(&headers(&format!("Bearer {}", token)), &codec)
            .unwrap()
            .unwrap();
        assert_eq!(
            user,
            AuthUser {
                user_id: 42,
                role: UserRole::Therapist
            }
        );
        assert!(!user.actor().is_admin());
    }

    #[test]
    fn test_malformed_header_rejected() {
        let err = authenticate(&headers("Basic abc"), &codec()).unwrap().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);

        let err = authenticate(&headers("Bearer not.a.jwt"), &codec())
            .unwrap()
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
