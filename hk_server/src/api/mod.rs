//! HTTP API for the HomeKrypto booking service.
//!
//! # Modules
//!
//! - [`bookings`]: Price calculator, share lookup and booking submission
//! - [`properties`]: Property browsing
//! - [`stats`]: Latest HKT market record
//! - [`middleware`]: Caller wallet from `X-Wallet-Address`, proven by a wallet session token
//! - [`request_id`]: Request correlation, access logging and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                  - Health check
//! GET  /api/properties                          - List bookable properties
//! GET  /api/properties/{id}                     - Get property
//! POST /api/bookings/calculate-price            - Quote a stay (wallet optional)
//! GET  /api/bookings/user-shares/{propertyId}   - Caller's shares (wallet required)
//! POST /api/bookings/create-stripe-booking      - Book and pay by card
//! POST /api/bookings/create-hkt-booking         - Book and pay by HKT transfer
//! GET  /api/bookings/mine                       - Caller's bookings (wallet required)
//! GET  /api/hkt-stats                           - Latest HKT price record
//! ```
//!
//! Wallet-aware endpoints take `X-Wallet-Address` together with
//! `Authorization: Bearer <wallet session token>`.
//!
//! Errors are returned as `{"success": false, "error": "..."}`.
//!
//! # CORS
//!
//! CORS is configured permissively for the browser front end.

pub mod bookings;
pub mod errors;
pub mod middleware;
pub mod properties;
pub mod request_id;
pub mod stats;

use axum::{
    Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use homekrypto::db::Database;
use homekrypto::{BookingManager, PriceFeed};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::WalletAuth;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub booking_manager: Arc<BookingManager>,
    pub price_feed: Arc<PriceFeed>,
    /// Absent when running on in-memory storage
    pub database: Option<Database>,
    pub wallet_auth: Arc<WalletAuth>,
}

impl FromRef<AppState> for Arc<WalletAuth> {
    fn from_ref(state: &AppState) -> Self {
        state.wallet_auth.clone()
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use hk_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let booking_routes = Router::new()
        .route("/calculate-price", post(bookings::calculate_price))
        .route("/user-shares/{property_id}", get(bookings::user_shares))
        .route("/create-stripe-booking", post(bookings::create_stripe_booking))
        .route("/create-hkt-booking", post(bookings::create_hkt_booking))
        .route("/mine", get(bookings::my_bookings));

    let api_routes = Router::new()
        .route("/properties", get(properties::list_properties))
        .route("/properties/{property_id}", get(properties::get_property))
        .route("/hkt-stats", get(stats::hkt_stats))
        .nest("/bookings", booking_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers (or none is configured) and
/// `503 Service Unavailable` otherwise. A missing HKT price is reported but
/// does not fail the check, since USD bookings still work without it.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"databaseLatencyMs":2,"hktPrice":{"available":true,...},"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (db_healthy, db_latency_ms) = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(elapsed) => (true, Some(elapsed.as_millis() as u64)),
            Err(e) => {
                tracing::warn!(error = %e, "Health check: database unreachable");
                (false, None)
            }
        },
        None => (true, None),
    };

    let latest = state.price_feed.latest().await;

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "databaseLatencyMs": db_latency_ms,
        "hktPrice": {
            "available": latest.is_some(),
            "source": latest.as_ref().map(|s| s.source.clone()),
            "lastUpdated": latest.as_ref().map(|s| s.last_updated.to_rfc3339()),
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
