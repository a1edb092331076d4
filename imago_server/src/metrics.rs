//! Prometheus metrics for the Imago server.
//!
//! Counters are recorded through the `metrics` facade and are no-ops until
//! [`init_metrics`] installs the Prometheus exporter.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use imago_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::signin_attempts_total(true);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record a completed HTTP request.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment signin attempts counter.
pub fn signin_attempts_total(success: bool) {
    metrics::counter!("signin_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment sessions created counter.
pub fn sessions_created_total() {
    metrics::counter!("sessions_created_total").increment(1);
}

/// Increment sessions revoked counter.
pub fn sessions_revoked_total() {
    metrics::counter!("sessions_revoked_total").increment(1);
}

/// Increment password reset requests counter.
pub fn password_resets_requested_total() {
    metrics::counter!("password_resets_requested_total").increment(1);
}

/// Increment password reset redemptions counter.
pub fn password_resets_redeemed_total(success: bool) {
    metrics::counter!("password_resets_redeemed_total",
        "success" => success.to_string()
    )
    .increment(1);
}
