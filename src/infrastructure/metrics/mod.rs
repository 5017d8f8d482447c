//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Bookings placed, split by whether a referral commission was created
//! - Commissions created for referred bookings
//! - Booking attempts rejected for overlapping an existing booking
//! - Login attempts by outcome

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "booking_server";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Bookings committed, labelled by whether an affiliate referred them
pub static BOOKINGS_PLACED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookings_placed_total", "Total number of bookings placed").namespace(NAMESPACE),
        &["referred"],
    )
    .expect("Failed to create BOOKINGS_PLACED_TOTAL metric")
});

/// Placement attempts rejected because the slot was taken
pub static BOOKING_CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "booking_conflicts_total",
            "Booking attempts rejected for overlapping an existing booking",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create BOOKING_CONFLICTS_TOTAL metric")
});

/// Commissions created at booking time
pub static COMMISSIONS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("commissions_created_total", "Total number of commissions created")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create COMMISSIONS_CREATED_TOTAL metric")
});

/// Login attempts by outcome ("success", "failure")
pub static LOGINS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("logins_total", "Login attempts by outcome").namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create LOGINS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(BOOKINGS_PLACED_TOTAL.clone()))
        .expect("Failed to register BOOKINGS_PLACED_TOTAL");
    registry
        .register(Box::new(BOOKING_CONFLICTS_TOTAL.clone()))
        .expect("Failed to register BOOKING_CONFLICTS_TOTAL");
    registry
        .register(Box::new(COMMISSIONS_CREATED_TOTAL.clone()))
        .expect("Failed to register COMMISSIONS_CREATED_TOTAL");
    registry
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("Failed to register LOGINS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_booking_placed(referred: bool) {
    BOOKINGS_PLACED_TOTAL
        .with_label_values(&[if referred { "true" } else { "false" }])
        .inc();
}

pub fn record_booking_conflict() {
    BOOKING_CONFLICTS_TOTAL.inc();
}

pub fn record_commission_created() {
    COMMISSIONS_CREATED_TOTAL.inc();
}

pub fn record_login(outcome: &str) {
    LOGINS_TOTAL.with_label_values(&[outcome]).inc();
}
