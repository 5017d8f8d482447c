//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints. Each handler builds its service
//! over the shared pool, so handlers stay thin: parse, call, map.

pub mod affiliate;
pub mod auth;
pub mod booking;
pub mod commission;
pub mod dashboard;
pub mod health;
pub mod license;
pub mod service;
pub mod therapist;
pub mod user;

use crate::domain::PageRequest;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Normalize `page`/`limit` query values against the configured bounds.
pub(crate) fn page_request(state: &AppState, page: Option<u32>, limit: Option<u32>) -> PageRequest {
    let pagination = &state.settings.pagination;
    PageRequest::new(page, limit, pagination.default_limit, pagination.max_limit)
}

/// Parse an optional string id from a body or query string.
pub(crate) fn parse_opt_id(raw: Option<&str>, what: &str) -> Result<Option<i64>, AppError> {
    raw.map(|raw| AppError::parse_id(raw, what)).transpose()
}
