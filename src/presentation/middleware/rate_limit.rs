//! Rate Limiting Middleware
//!
//! In-process fixed-window rate limiting for the authentication endpoints,
//! keyed by client IP.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

/// Windows are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

/// Information about rate limit status returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the current window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp when the rate limit resets
    pub reset_at: i64,
    /// Seconds until the rate limit resets
    pub retry_after: u64,
}

/// Rate limit exceeded error response.
#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    rate_limit: RateLimitInfo,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter per client identifier.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit: limit.max(1),
            window,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.auth_requests_per_window,
            Duration::from_secs(settings.window_seconds.max(1)),
        )
    }

    /// Count one request. `Err` carries the info for a 429 response.
    pub fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        self.check_at(identifier, Instant::now())
    }

    fn check_at(&self, identifier: &str, now: Instant) -> Result<RateLimitInfo, RateLimitInfo> {
        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let (window, allowed) = {
            let mut entry = self
                .windows
                .entry(identifier.to_string())
                .or_insert(Window {
                    started: now,
                    count: 0,
                });

            if now.duration_since(entry.started) >= self.window {
                *entry = Window {
                    started: now,
                    count: 0,
                };
            }

            let allowed = entry.count < self.limit;
            if allowed {
                entry.count += 1;
            }
            (*entry, allowed)
        };

        let resets_in = self
            .window
            .saturating_sub(now.duration_since(window.started));
        let info = RateLimitInfo {
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
            reset_at: Utc::now().timestamp() + resets_in.as_secs() as i64,
            retry_after: 0,
        };

        if allowed {
            Ok(info)
        } else {
            Err(RateLimitInfo {
                retry_after: resets_in.as_secs().max(1),
                ..info
            })
        }
    }

    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now.duration_since(w.started) < window);
    }
}

/// Extract client identifier: first `X-Forwarded-For` hop, else the socket address.
fn extract_identifier(request: &Request, client_ip: Option<IpAddr>) -> String {
    if let Some(forwarded_for) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded_for.split(',').next() {
            let ip = first_ip.trim();
            if ip.parse::<IpAddr>().is_ok() {
                return format!("ip:{}", ip);
            }
        }
    }

    match client_ip {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Rate limit middleware for authentication endpoints.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = extract_identifier(&request, client_ip);

    match state.rate_limiter.check(&identifier) {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(identifier = %identifier, "Rate limit exceeded");
            create_rate_limit_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut header::HeaderMap, info: &RateLimitInfo) {
    if let Ok(v) = header::HeaderValue::from_str(&info.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = header::HeaderValue::from_str(&info.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = header::HeaderValue::from_str(&info.reset_at.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
}

fn create_rate_limit_response(info: RateLimitInfo) -> Response {
    let retry_after = info.retry_after;
    let body = RateLimitExceededResponse {
        error: ErrorResponse {
            code: 10006,
            message: "You are being rate limited. Please slow down.".to_string(),
            errors: None,
        },
        rate_limit: info.clone(),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

    if let Ok(v) = header::HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, v);
    }
    add_rate_limit_headers(response.headers_mut(), &info);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for expected_remaining in [2, 1, 0] {
            let info = limiter.check_at("ip:1.2.3.4", now).unwrap();
            assert_eq!(info.remaining, expected_remaining);
        }

        let blocked = limiter.check_at("ip:1.2.3.4", now).unwrap_err();
        assert_eq!(blocked.remaining, 0);
        assert!(blocked.retry_after >= 1);

        // Other clients have their own window
        assert!(limiter.check_at("ip:5.6.7.8", now).is_ok());
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.check_at("ip:1.2.3.4", start).is_ok());
        assert!(limiter.check_at("ip:1.2.3.4", start).is_err());
        assert!(limiter
            .check_at("ip:1.2.3.4", start + Duration::from_secs(10))
            .is_ok());
    }

    #[test]
    fn test_identifier_prefers_forwarded_for() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let socket_ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(extract_identifier(&request, Some(socket_ip)), "ip:203.0.113.9");

        let request = Request::builder()
            .header("x-forwarded-for", "garbage")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_identifier(&request, Some(socket_ip)), "ip:127.0.0.1");
        assert_eq!(extract_identifier(&request, None), "ip:unknown");
    }

    #[test]
    fn test_rejection_response() {
        let response = create_rate_limit_response(RateLimitInfo {
            limit: 5,
            remaining: 0,
            reset_at: 0,
            retry_after: 12,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
        assert_eq!(response.headers()["X-RateLimit-Limit"], "5");
    }
}
