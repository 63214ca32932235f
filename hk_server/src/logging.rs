//! Structured logging configuration.
//!
//! The `homekrypto` library logs through the `log` facade; `tracing-subscriber`
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use hk_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the outcome of a payment attempt
///
/// # Arguments
///
/// * `method` - Payment method (`card`, `hkt_transfer`)
/// * `outcome` - `confirmed`, `replayed` or a failure kind
/// * `reference` - Booking reference when one exists
/// * `message` - Event message
pub fn log_payment_event(method: &str, outcome: &str, reference: Option<&str>, message: &str) {
    match outcome {
        "confirmed" | "replayed" => tracing::info!(
            payment_method = method,
            outcome = outcome,
            booking_reference = reference,
            "PAYMENT: {}",
            message
        ),
        _ => tracing::warn!(
            payment_method = method,
            outcome = outcome,
            booking_reference = reference,
            "PAYMENT: {}",
            message
        ),
    }
}

/// Log one price-feed poll
///
/// # Arguments
///
/// * `source` - Provider that answered, if any
/// * `price` - Accepted USD price, if any
/// * `duration_ms` - Poll duration in milliseconds
pub fn log_price_poll(source: Option<&str>, price: Option<f64>, duration_ms: u64) {
    match (source, price) {
        (Some(source), Some(price)) => tracing::info!(
            source = source,
            price_usd = price,
            duration_ms = duration_ms,
            "HKT price updated"
        ),
        _ => tracing::warn!(
            duration_ms = duration_ms,
            "HKT price poll failed, keeping previous price"
        ),
    }
}

/// Access log line for one request.
///
/// Server errors are logged at `error`, everything else at `info`.
pub fn log_api_request(
    method: &str,
    route: &str,
    status_code: u16,
    duration_ms: u64,
    wallet: Option<&str>,
) {
    if status_code >= 500 {
        tracing::error!(
            http_method = method,
            http_route = route,
            http_status = status_code,
            duration_ms = duration_ms,
            wallet = wallet,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_route = route,
            http_status = status_code,
            duration_ms = duration_ms,
            wallet = wallet,
            "API request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_payment_event() {
        // Just ensure it doesn't panic
        log_payment_event("card", "confirmed", Some("HK-ABCDEF12"), "Booking confirmed");
        log_payment_event("hkt_transfer", "declined", None, "Transfer rejected");
    }

    #[test]
    fn test_log_price_poll() {
        log_price_poll(Some("coingecko"), Some(0.1), 120);
        log_price_poll(None, None, 10_000);
    }

    #[test]
    fn test_log_api_request() {
        log_api_request("POST", "/api/bookings/calculate-price", 200, 12, None);
        log_api_request("GET", "/api/properties/{property_id}", 404, 3, None);
        log_api_request("POST", "/api/bookings/create-stripe-booking", 503, 20_000, Some("0xabc"));
    }
}
