//! Role and authentication checks on protected resources

use axum::http::StatusCode;
use serde_json::json;

use booking_server::domain::UserRole;

use crate::common::TestApp;

#[tokio::test]
async fn test_protected_collections_require_authentication() {
    let app = TestApp::new();

    for path in [
        "/api/v1/users",
        "/api/v1/affiliates",
        "/api/v1/affiliates/me",
        "/api/v1/commissions",
        "/api/v1/commissions/summary",
        "/api/v1/licenses",
        "/api/v1/dashboard",
    ] {
        let response = app.server.get(path).await;
        assert_eq!(
            response.status_code(),
            StatusCode::UNAUTHORIZED,
            "{} should require a token",
            path
        );
    }
}

#[tokio::test]
async fn test_writes_on_catalogue_require_authentication() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/therapists")
        .json(&json!({ "user_id": "1", "specialization": "Sports massage" }))
        .await;
    response.assert_status_unauthorized();

    let response = app.server.delete("/api/v1/services/1").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_client_cannot_list_users() {
    let app = TestApp::new();
    let token = app.token_for(10, UserRole::Client);

    let response = app
        .server
        .get("/api/v1/users")
        .authorization_bearer(token)
        .await;

    response.assert_status_forbidden();
}

#[tokio::test]
async fn test_therapist_cannot_issue_licenses() {
    let app = TestApp::new();
    let token = app.token_for(11, UserRole::Therapist);

    let response = app
        .server
        .post("/api/v1/licenses")
        .authorization_bearer(token)
        .json(&json!({ "quantity": 5 }))
        .await;

    response.assert_status_forbidden();
}

#[tokio::test]
async fn test_license_quantity_is_bounded() {
    let app = TestApp::new();
    let token = app.token_for(1, UserRole::Admin);

    let response = app
        .server
        .post("/api/v1/licenses")
        .authorization_bearer(token)
        .json(&json!({ "quantity": 500 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_license_expiry_is_bounded() {
    let app = TestApp::new();
    let token = app.token_for(1, UserRole::Admin);

    for days in [json!(36501), json!(i64::MAX)] {
        let response = app
            .server
            .post("/api/v1/licenses")
            .authorization_bearer(token.clone())
            .json(&json!({ "quantity": 1, "expires_in_days": days }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_non_numeric_path_ids_are_rejected() {
    let app = TestApp::new();
    let token = app.token_for(1, UserRole::Admin);

    for path in [
        "/api/v1/users/me-please",
        "/api/v1/affiliates/x",
        "/api/v1/commissions/x",
    ] {
        let response = app
            .server
            .get(path)
            .authorization_bearer(token.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", path);
    }
}
