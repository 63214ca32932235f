//! HKT market statistics handler.

use axum::{Json, extract::State, http::StatusCode};
use homekrypto::HktPriceSnapshot;

use super::AppState;
use super::errors::{ApiError, error};

/// Latest polled HKT price record.
///
/// # Response
///
/// ```json
/// {
///   "price": 0.1025,
///   "priceChange24h": 3.2,
///   "marketCap": 51250000.0,
///   "volume24h": 81234.5,
///   "totalSupply": null,
///   "lastUpdated": "2025-11-22T10:30:00Z",
///   "source": "dexscreener"
/// }
/// ```
///
/// # Errors
///
/// - `503 Service Unavailable`: No price has been fetched yet
pub async fn hkt_stats(State(state): State<AppState>) -> Result<Json<HktPriceSnapshot>, ApiError> {
    state.price_feed.latest().await.map(Json).ok_or_else(|| {
        error(
            StatusCode::SERVICE_UNAVAILABLE,
            "HKT price data unavailable, please retry shortly",
        )
    })
}
