//! Prometheus metrics for the booking service.
//!
//! Metrics are exposed in Prometheus text format on a separate listener for
//! scraping by monitoring systems. Recording is a no-op until
//! [`init_metrics`] installs the exporter, so handlers and tests call these
//! functions unconditionally.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and durations per route template and status
//! - **Booking Metrics**: Quotes and bookings by outcome
//! - **Price Feed Metrics**: Polls by outcome, current HKT price
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use hk_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/bookings/calculate-price", 200);
//! metrics::hkt_price_usd(0.1);
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

/// Count a finished request under its route template.
pub fn http_requests_total(method: &str, route: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, route: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Booking Metrics
// ============================================================================

/// Increment quotes counter.
pub fn quotes_total(currency: &str, owner: bool) {
    metrics::counter!("quotes_total",
        "currency" => currency.to_string(),
        "owner" => owner.to_string()
    )
    .increment(1);
}

/// Increment bookings counter by payment method and outcome.
pub fn bookings_total(method: &str, outcome: &str) {
    metrics::counter!("bookings_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// Price Feed Metrics
// ============================================================================

/// Increment price polls counter.
pub fn price_polls_total(success: bool) {
    metrics::counter!("price_polls_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Set the latest accepted HKT price.
pub fn hkt_price_usd(price: f64) {
    metrics::gauge!("hkt_price_usd").set(price);
}

/// Record price poll duration in milliseconds.
pub fn price_poll_duration_ms(duration_ms: f64) {
    metrics::histogram!("price_poll_duration_ms").record(duration_ms);
}
