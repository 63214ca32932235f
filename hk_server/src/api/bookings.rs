//! Booking API handlers.
//!
//! This module provides the booking calculator and submission endpoints:
//! - Quoting a stay in USD or HKT, with owner pricing for share holders
//! - Looking up the caller's shares in a property
//! - Submitting card and HKT-transfer bookings
//! - Listing the caller's bookings
//!
//! # Examples
//!
//! Quote a stay:
//! ```bash
//! curl -X POST http://localhost:8080/api/bookings/calculate-price \
//!   -H "Content-Type: application/json" \
//!   -H "X-Wallet-Address: 0x1111111111111111111111111111111111111111" \
//!   -H "Authorization: Bearer $WALLET_SESSION_TOKEN" \
//!   -d '{"propertyId": 1, "checkIn": "2026-03-01", "checkOut": "2026-03-08", "guests": 2, "currency": "HKT"}'
//! ```
//!
//! Book it by card:
//! ```bash
//! curl -X POST http://localhost:8080/api/bookings/create-stripe-booking \
//!   -H "Content-Type: application/json" \
//!   -d '{"propertyId": 1, "checkIn": "2026-03-01", "checkOut": "2026-03-08", "guests": 2,
//!        "paymentSource": "tok_visa", "idempotencyKey": "6f1c..."}'
//! ```

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use homekrypto::booking::models::{
    Booking, BookingConfirmation, CalculatePriceRequest, CreateBookingRequest, PaymentMethod,
};
use homekrypto::property::PropertyId;
use homekrypto::{OwnershipStatus, PriceQuote, WalletAddress};
use serde::Serialize;

use super::AppState;
use super::errors::{ApiError, booking_error, booking_status, json_rejection};
use super::middleware::{CallerWallet, RequiredWallet};
use super::request_id::RequestId;
use crate::{logging, metrics};

/// Successful booking submission
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub booking: Booking,
    /// True when the idempotency key matched an earlier booking
    pub replayed: bool,
}

impl From<BookingConfirmation> for BookingResponse {
    fn from(confirmation: BookingConfirmation) -> Self {
        Self {
            success: true,
            booking: confirmation.booking,
            replayed: confirmation.replayed,
        }
    }
}

/// Quote a stay.
///
/// The `X-Wallet-Address` header is optional; when present it must carry a
/// wallet session token, and if the wallet holds an unused free week for the
/// property the quote is an owner booking (cleaning fee only).
///
/// # Errors
///
/// - `400 Bad Request`: Bad dates, stay length, guest count or malformed body
/// - `401 Unauthorized`: Wallet header without a valid session token
/// - `404 Not Found`: Property doesn't exist
/// - `503 Service Unavailable`: HKT quote requested without a fresh HKT price
pub async fn calculate_price(
    State(state): State<AppState>,
    CallerWallet(wallet): CallerWallet,
    payload: Result<Json<CalculatePriceRequest>, JsonRejection>,
) -> Result<Json<PriceQuote>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;

    let quote = state
        .booking_manager
        .quote(&request, wallet.as_ref())
        .await
        .map_err(booking_error)?;

    metrics::quotes_total(&quote.currency.to_string(), quote.is_owner_booking);
    Ok(Json(quote))
}

/// Share ownership of the caller in a property.
///
/// Registry failures answer "no ownership" rather than an error.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or malformed `X-Wallet-Address`
/// - `401 Unauthorized`: No valid wallet session token for that address
pub async fn user_shares(
    State(state): State<AppState>,
    RequiredWallet(wallet): RequiredWallet,
    Path(property_id): Path<PropertyId>,
) -> Json<OwnershipStatus> {
    Json(
        state
            .booking_manager
            .ownership_status(&wallet, property_id)
            .await,
    )
}

/// Book a stay paid by card.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failure or quote mismatch
/// - `401 Unauthorized`: Wallet header without a valid session token
/// - `402 Payment Required`: Card declined
/// - `409 Conflict`: Dates already booked, or the free week was just used
/// - `422 Unprocessable Entity`: Idempotency key reused for a different request
/// - `501 Not Implemented`: No payment processor configured
/// - `503 Service Unavailable`: Payment processor unavailable, or the same key is still in flight
pub async fn create_stripe_booking(
    State(state): State<AppState>,
    request_id: RequestId,
    CallerWallet(wallet): CallerWallet,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    submit(&state, &request_id, PaymentMethod::Card, wallet, request).await
}

/// Book a stay paid by HKT transfer.
///
/// # Errors
///
/// As for card bookings, plus `503 Service Unavailable` when no fresh HKT
/// price is available to convert the total.
pub async fn create_hkt_booking(
    State(state): State<AppState>,
    request_id: RequestId,
    CallerWallet(wallet): CallerWallet,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    submit(&state, &request_id, PaymentMethod::HktTransfer, wallet, request).await
}

async fn submit(
    state: &AppState,
    request_id: &RequestId,
    method: PaymentMethod,
    wallet: Option<WalletAddress>,
    request: CreateBookingRequest,
) -> Result<Json<BookingResponse>, ApiError> {
    let method_name = method.to_string();

    match state
        .booking_manager
        .submit(&request, method, wallet.as_ref())
        .await
    {
        Ok(confirmation) => {
            let outcome = if confirmation.replayed {
                "replayed"
            } else {
                "confirmed"
            };
            metrics::bookings_total(&method_name, outcome);
            logging::log_payment_event(
                &method_name,
                outcome,
                Some(&confirmation.booking.reference),
                &format!("request {}", request_id.as_str()),
            );
            Ok(Json(confirmation.into()))
        }
        Err(e) => {
            let status = booking_status(&e);
            let outcome = if status.is_client_error() {
                "rejected"
            } else {
                "failed"
            };
            metrics::bookings_total(&method_name, outcome);
            logging::log_payment_event(
                &method_name,
                outcome,
                None,
                &format!("request {}: {}", request_id.as_str(), e),
            );
            Err(booking_error(e))
        }
    }
}

/// Bookings made by the caller, newest first.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or malformed `X-Wallet-Address`
/// - `401 Unauthorized`: No valid wallet session token for that address
pub async fn my_bookings(
    State(state): State<AppState>,
    RequiredWallet(wallet): RequiredWallet,
) -> Result<Json<Vec<Booking>>, ApiError> {
    state
        .booking_manager
        .bookings_for_wallet(&wallet)
        .await
        .map(Json)
        .map_err(booking_error)
}
