//! Property browsing handlers.
//!
//! ```bash
//! curl http://localhost:8080/api/properties
//! curl http://localhost:8080/api/properties/1
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use homekrypto::Property;
use homekrypto::property::PropertyId;

use super::AppState;
use super::errors::{ApiError, booking_error};

/// List bookable properties.
///
/// # Errors
///
/// - `500 Internal Server Error`: Storage failure
pub async fn list_properties(
    State(state): State<AppState>,
) -> Result<Json<Vec<Property>>, ApiError> {
    state
        .booking_manager
        .list_properties()
        .await
        .map(Json)
        .map_err(booking_error)
}

/// Get one property, including inactive ones.
///
/// # Errors
///
/// - `404 Not Found`: Property doesn't exist
pub async fn get_property(
    State(state): State<AppState>,
    Path(property_id): Path<PropertyId>,
) -> Result<Json<Property>, ApiError> {
    state
        .booking_manager
        .get_property(property_id)
        .await
        .map(Json)
        .map_err(booking_error)
}
