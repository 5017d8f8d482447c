//! Authentication API Tests

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{test_settings, unique_email, TestApp};

#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "not-an-email",
            "password": "ValidPassword123!",
            "full_name": "Test User"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["field"], "email");
}

#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email(),
            "password": "short",
            "full_name": "Test User"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["field"], "password");
}

#[tokio::test]
async fn test_register_with_missing_field_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": unique_email() }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_invalid_email_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "nope", "password": "whatever1" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_without_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/auth/me").await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_me_with_garbage_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/auth/me")
        .authorization_bearer("not.a.token")
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = TestApp::new();
    let mut other = test_settings();
    other.jwt.secret = "another-secret-that-is-long-enough-0123".into();
    let foreign = TestApp::with_settings(other);
    let token = foreign.token_for(42, booking_server::domain::UserRole::Admin);

    let response = app
        .server
        .get("/api/v1/auth/me")
        .authorization_bearer(token)
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let mut settings = test_settings();
    settings.rate_limit.auth_requests_per_window = 2;
    let app = TestApp::with_settings(settings);
    let body = json!({ "email": "bad", "password": "x" });

    for _ in 0..2 {
        let response = app
            .server
            .post("/api/v1/auth/login")
            .add_header("x-forwarded-for", "203.0.113.9")
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.header("x-ratelimit-limit"), "2");
    }

    let response = app
        .server
        .post("/api/v1/auth/login")
        .add_header("x-forwarded-for", "203.0.113.9")
        .json(&body)
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.maybe_header("retry-after").is_some());

    // A different client still has its own window
    let response = app
        .server
        .post("/api/v1/auth/login")
        .add_header("x-forwarded-for", "203.0.113.10")
        .json(&body)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
