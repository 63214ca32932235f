//! Integration tests for hk_client against a local stub server.
//!
//! Tests retry classification, idempotency-key reuse across retries, and
//! network error handling.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use hk_client::{ApiClient, ClientError, RetryPolicy};
use homekrypto::booking::models::{
    Booking, BookingStatus, CalculatePriceRequest, CreateBookingRequest, Currency, PaymentMethod,
    generate_reference,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct StubState {
    /// Status codes returned before the stub starts succeeding
    failures: Mutex<Vec<StatusCode>>,
    /// Delay before answering the next new booking, then cleared
    stall: Mutex<Option<Duration>>,
    attempts: AtomicU32,
    keys_seen: Mutex<Vec<String>>,
    bookings: Mutex<HashMap<String, Booking>>,
}

type Stub = Arc<StubState>;

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(5),
        attempt_timeout: Duration::from_millis(500),
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, day).unwrap()
}

fn booking_request(key: Option<&str>) -> CreateBookingRequest {
    CreateBookingRequest {
        property_id: 1,
        check_in: date(1),
        check_out: date(8),
        guests: 2,
        payment_source: "tok_visa".to_string(),
        guest_email: None,
        quoted_total_usd: None,
        idempotency_key: key.map(str::to_string),
    }
}

async fn create_booking(
    State(stub): State<Stub>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    stub.attempts.fetch_add(1, Ordering::SeqCst);
    let key = request.idempotency_key.clone().unwrap_or_default();
    stub.keys_seen.lock().await.push(key.clone());

    let mut failures = stub.failures.lock().await;
    if !failures.is_empty() {
        let status = failures.remove(0);
        return Err((status, Json(json!({"success": false, "error": "stub failure"}))));
    }
    drop(failures);

    let mut bookings = stub.bookings.lock().await;
    if let Some(existing) = bookings.get(&key) {
        return Ok(Json(json!({"success": true, "booking": existing, "replayed": true})));
    }

    let id = uuid::Uuid::new_v4();
    let booking = Booking {
        id,
        reference: generate_reference(&id),
        property_id: request.property_id,
        wallet_address: None,
        guest_email: request.guest_email,
        check_in: request.check_in,
        check_out: request.check_out,
        guests: request.guests,
        nights: 7,
        total_usd: 3240.0,
        total_hkt: None,
        hkt_rate: None,
        payment_method: PaymentMethod::Card,
        payment_reference: "ch_1".to_string(),
        is_owner_booking: false,
        idempotency_key: key.clone(),
        request_fingerprint: String::new(),
        status: BookingStatus::Confirmed,
        created_at: Utc::now(),
    };
    bookings.insert(key, booking.clone());
    drop(bookings);

    // Booking is stored even if the client stops waiting
    let stall = stub.stall.lock().await.take();
    if let Some(delay) = stall {
        tokio::time::sleep(delay).await;
    }

    Ok(Json(json!({"success": true, "booking": booking, "replayed": false})))
}

async fn calculate_price(
    State(stub): State<Stub>,
    Json(request): Json<CalculatePriceRequest>,
) -> (StatusCode, Json<Value>) {
    stub.attempts.fetch_add(1, Ordering::SeqCst);
    if request.guests > 8 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Maximum 8 guests allowed for this property, requested 9"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "propertyId": request.property_id,
            "nights": 7,
            "guests": request.guests,
            "nightlyRate": 450.0,
            "basePrice": 3150.0,
            "cleaningFee": 90.0,
            "totalUsd": 3240.0,
            "totalHkt": null,
            "currency": "USD",
            "isOwnerBooking": false,
            "hktRate": null,
            "rateFetchedAt": null
        })),
    )
}

async fn hkt_stats(State(stub): State<Stub>) -> (StatusCode, Json<Value>) {
    stub.attempts.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"success": false, "error": "HKT price data unavailable, please retry shortly"})),
    )
}

/// Start the stub server on an ephemeral port
async fn start_stub() -> (String, Stub) {
    let stub: Stub = Arc::new(StubState::default());
    let app = Router::new()
        .route("/api/bookings/create-stripe-booking", post(create_booking))
        .route("/api/bookings/calculate-price", post(calculate_price))
        .route("/api/hkt-stats", get(hkt_stats))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}

// ============================================================================
// Retry Behaviour
// ============================================================================

#[tokio::test]
async fn test_transient_failures_reuse_idempotency_key() {
    let (url, stub) = start_stub().await;
    *stub.failures.lock().await = vec![StatusCode::SERVICE_UNAVAILABLE, StatusCode::BAD_GATEWAY];

    let client = ApiClient::new(url).with_retry_policy(fast_policy());
    let receipt = client.create_card_booking(booking_request(None)).await.unwrap();

    assert!(!receipt.replayed);
    assert_eq!(stub.attempts.load(Ordering::SeqCst), 3);

    let keys = stub.keys_seen.lock().await.clone();
    assert_eq!(keys.len(), 3);
    assert!(!keys[0].is_empty(), "client should generate a key");
    assert!(keys.iter().all(|k| k == &keys[0]), "key must be reused: {keys:?}");
    assert_eq!(receipt.booking.idempotency_key, keys[0]);
}

#[tokio::test]
async fn test_lost_response_is_replayed_not_duplicated() {
    let (url, stub) = start_stub().await;
    // First attempt books but the response arrives after the client gave up
    *stub.stall.lock().await = Some(Duration::from_millis(300));

    let policy = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(400),
        attempt_timeout: Duration::from_millis(100),
    };
    let client = ApiClient::new(url).with_retry_policy(policy);
    let receipt = client
        .create_card_booking(booking_request(Some("lost-response")))
        .await
        .unwrap();

    assert!(receipt.replayed);
    assert_eq!(stub.bookings.lock().await.len(), 1);
    assert_eq!(stub.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_validation_errors_are_not_retried() {
    let (url, stub) = start_stub().await;
    let client = ApiClient::new(url).with_retry_policy(fast_policy());

    let request = CalculatePriceRequest {
        property_id: 1,
        check_in: date(1),
        check_out: date(8),
        guests: 9,
        currency: Currency::Usd,
    };
    let err = client.calculate_price(&request).await.unwrap_err();

    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Maximum 8 guests"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stub.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_conflict_is_not_retried() {
    let (url, stub) = start_stub().await;
    *stub.failures.lock().await = vec![StatusCode::CONFLICT];

    let client = ApiClient::new(url).with_retry_policy(fast_policy());
    let err = client
        .create_card_booking(booking_request(Some("taken")))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 409, .. }));
    assert_eq!(stub.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_persistent_outage_gives_up() {
    let (url, stub) = start_stub().await;
    let client = ApiClient::new(url).with_retry_policy(fast_policy());

    let err = client.hkt_stats().await.unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 503, .. }));
    assert_eq!(stub.attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_quote_success() {
    let (url, _stub) = start_stub().await;
    let client = ApiClient::new(url).with_retry_policy(fast_policy());

    let request = CalculatePriceRequest {
        property_id: 1,
        check_in: date(1),
        check_out: date(8),
        guests: 2,
        currency: Currency::Usd,
    };
    let quote = client.calculate_price(&request).await.unwrap();

    assert_eq!(quote.nights, 7);
    assert_eq!(quote.total_usd, 3240.0);
    assert!(quote.total_hkt.is_none());
}

// ============================================================================
// Network Error Scenario Tests
// ============================================================================

#[tokio::test]
async fn test_connection_refused_is_retried_then_reported() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{}", addr)).with_retry_policy(fast_policy());
    let err = client.properties().await.unwrap_err();

    assert!(matches!(err, ClientError::Network(_)), "got {err}");
}

#[tokio::test]
async fn test_invalid_hostname() {
    let client = ApiClient::new("http://invalid-hostname-that-does-not-exist.local")
        .with_retry_policy(RetryPolicy::none(Duration::from_secs(5)));

    let result = client.properties().await;

    assert!(result.is_err(), "Should fail with invalid hostname");
}
