//! Booking API Tests
//!
//! Placement input is checked before any slot is locked.

use axum::http::StatusCode;
use serde_json::{json, Value};

use booking_server::domain::UserRole;

use crate::common::TestApp;

fn booking_body() -> Value {
    json!({
        "service_id": "1234567890",
        "booking_date": "2030-06-01",
        "start_time": "10:00",
        "client_name": "Jane Client",
        "client_email": "jane@example.com"
    })
}

#[tokio::test]
async fn test_booking_with_invalid_client_email_fails() {
    let app = TestApp::new();
    let mut body = booking_body();
    body["client_email"] = json!("not-an-email");

    let response = app.server.post("/api/v1/bookings").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["field"], "client_email");
}

#[tokio::test]
async fn test_booking_with_empty_client_name_fails() {
    let app = TestApp::new();
    let mut body = booking_body();
    body["client_name"] = json!("");

    let response = app.server.post("/api/v1/bookings").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_with_whitespace_client_name_fails() {
    let app = TestApp::new();
    let mut body = booking_body();
    body["client_name"] = json!("   ");

    let response = app.server.post("/api/v1/bookings").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["field"], "client_name");
}

#[tokio::test]
async fn test_booking_with_non_numeric_service_id_fails() {
    let app = TestApp::new();
    let mut body = booking_body();
    body["service_id"] = json!("massage");

    let response = app.server.post("/api/v1/bookings").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid service ID");
}

#[tokio::test]
async fn test_booking_with_malformed_start_time_fails() {
    let app = TestApp::new();

    for raw in ["25:00", "10", "ten o'clock"] {
        let mut body = booking_body();
        body["start_time"] = json!(raw);

        let response = app.server.post("/api/v1/bookings").json(&body).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_booking_with_malformed_date_fails() {
    let app = TestApp::new();
    let mut body = booking_body();
    body["booking_date"] = json!("01/06/2030");

    let response = app.server.post("/api/v1/bookings").json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_with_invalid_bearer_token_is_rejected() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/bookings")
        .authorization_bearer("expired-or-forged")
        .json(&booking_body())
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_listing_bookings_requires_authentication() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/bookings").await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_get_booking_with_non_numeric_id_fails() {
    let app = TestApp::new();
    let token = app.token_for(1, UserRole::Client);

    let response = app
        .server
        .get("/api/v1/bookings/abc")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_update_with_unknown_status_fails() {
    let app = TestApp::new();
    let token = app.token_for(1, UserRole::Admin);

    let response = app
        .server
        .patch("/api/v1/bookings/1/status")
        .authorization_bearer(token)
        .json(&json!({ "status": "teleported" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
