//! Route Configuration
//!
//! Configures all HTTP routes for the API. Every resource is split into a
//! public router (optional authentication) and a protected router, merged
//! under the resource prefix.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, optional_auth_middleware, rate_limit_auth};
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/affiliates", affiliate_routes(state.clone()))
        .nest("/therapists", therapist_routes(state.clone()))
        .nest("/services", service_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/commissions", commission_routes(state.clone()))
        .nest("/licenses", license_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state))
}

fn protected(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

fn public(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        state.clone(),
        optional_auth_middleware,
    ))
}

/// Authentication routes; the whole group is rate limited per client
fn auth_routes(state: AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route("/logout", post(handlers::auth::logout));

    let signed_in = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/password", put(handlers::auth::change_password));

    open.merge(protected(signed_in, &state))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_auth))
}

fn user_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new()
            .route("/", get(handlers::user::list_users))
            .route(
                "/{id}",
                get(handlers::user::get_user)
                    .patch(handlers::user::update_user)
                    .delete(handlers::user::deactivate_user),
            ),
        &state,
    )
}

fn affiliate_routes(state: AppState) -> Router<AppState> {
    let open = Router::new().route("/validate/{code}", get(handlers::affiliate::validate_code));

    let signed_in = Router::new()
        .route(
            "/",
            post(handlers::affiliate::create_affiliate).get(handlers::affiliate::list_affiliates),
        )
        .route("/me", get(handlers::affiliate::my_affiliate))
        .route(
            "/{id}",
            get(handlers::affiliate::get_affiliate)
                .patch(handlers::affiliate::update_affiliate)
                .delete(handlers::affiliate::deactivate_affiliate),
        );

    open.merge(protected(signed_in, &state))
}

fn therapist_routes(state: AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/", get(handlers::therapist::list_therapists))
        .route("/{id}", get(handlers::therapist::get_therapist))
        .route("/{id}/services", get(handlers::therapist::therapist_services))
        .route("/{id}/availability", get(handlers::therapist::availability));

    let signed_in = Router::new()
        .route("/", post(handlers::therapist::create_therapist))
        .route(
            "/{id}",
            patch(handlers::therapist::update_therapist)
                .delete(handlers::therapist::deactivate_therapist),
        );

    public(open, &state).merge(protected(signed_in, &state))
}

fn service_routes(state: AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/", get(handlers::service::list_services))
        .route("/{id}", get(handlers::service::get_service));

    let signed_in = Router::new()
        .route("/", post(handlers::service::create_service))
        .route(
            "/{id}",
            patch(handlers::service::update_service).delete(handlers::service::deactivate_service),
        );

    public(open, &state).merge(protected(signed_in, &state))
}

fn booking_routes(state: AppState) -> Router<AppState> {
    let open = Router::new().route("/", post(handlers::booking::create_booking));

    let signed_in = Router::new()
        .route("/", get(handlers::booking::list_bookings))
        .route("/{id}", get(handlers::booking::get_booking))
        .route("/{id}/status", patch(handlers::booking::update_booking_status));

    public(open, &state).merge(protected(signed_in, &state))
}

fn commission_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new()
            .route("/", get(handlers::commission::list_commissions))
            .route("/summary", get(handlers::commission::commission_summary))
            .route("/{id}", get(handlers::commission::get_commission))
            .route(
                "/{id}/status",
                patch(handlers::commission::update_commission_status),
            ),
        &state,
    )
}

fn license_routes(state: AppState) -> Router<AppState> {
    let open = Router::new().route(
        "/validate/{serial_key}",
        get(handlers::license::validate_license),
    );

    let signed_in = Router::new()
        .route(
            "/",
            post(handlers::license::issue_licenses).get(handlers::license::list_licenses),
        )
        .route("/activate", post(handlers::license::activate_license))
        .route("/{id}", delete(handlers::license::revoke_license));

    open.merge(protected(signed_in, &state))
}

fn dashboard_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new().route("/", get(handlers::dashboard::overview)),
        &state,
    )
}
