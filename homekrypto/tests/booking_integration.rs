//! Integration tests for quoting and submitting bookings.
//!
//! Runs the booking manager against the in-memory repositories, a scripted
//! payment gateway and a fixed HKT price. The concurrent cases hold two
//! submissions at a barrier so they race through reservation and charging.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use homekrypto::booking::manager::BookingBackends;
use homekrypto::booking::models::{
    BookingConfirmation, BookingStatus, CalculatePriceRequest, CreateBookingRequest, Currency,
    PaymentMethod,
};
use homekrypto::booking::{BookingError, BookingManager, BookingPolicy};
use homekrypto::db::memory::{InMemoryBookingRepository, InMemoryPropertyRepository};
use homekrypto::notify::LogNotifier;
use homekrypto::ownership::{InMemoryOwnershipOracle, OwnershipError, OwnershipResult};
use homekrypto::payment::{ChargeRequest, PaymentError, PaymentGateway, PaymentReceipt, PaymentResult};
use homekrypto::property::PropertyId;
use homekrypto::{
    BookingResult, HktPriceSnapshot, OwnershipOracle, OwnershipStatus, PriceFeed, Property,
    WalletAddress,
};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

const OWNER: &str = "0x1111111111111111111111111111111111111111";
const OTHER: &str = "0x2222222222222222222222222222222222222222";

/// How long a party waits at a barrier before going on alone
const RENDEZVOUS_WAIT: std::time::Duration = std::time::Duration::from_millis(200);

async fn rendezvous(barrier: Option<&Barrier>) {
    if let Some(barrier) = barrier {
        let _ = tokio::time::timeout(RENDEZVOUS_WAIT, barrier.wait()).await;
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Gateway that records charges, optionally failing its next call
#[derive(Default)]
struct ScriptedGateway {
    charges: Mutex<Vec<ChargeRequest>>,
    failure: Mutex<Option<PaymentError>>,
    /// Holds each charge until a second one arrives
    rendezvous: Option<Barrier>,
}

impl ScriptedGateway {
    fn failing(error: PaymentError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    fn paired() -> Self {
        Self {
            rendezvous: Some(Barrier::new(2)),
            ..Self::default()
        }
    }

    fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(&self, request: &ChargeRequest) -> PaymentResult<PaymentReceipt> {
        rendezvous(self.rendezvous.as_ref()).await;

        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }

        let mut charges = self.charges.lock().unwrap();
        charges.push(request.clone());
        Ok(PaymentReceipt {
            reference: format!("ch_{}", charges.len()),
            amount: request.amount,
            currency: request.currency,
            processed_at: now(),
        })
    }
}

/// Registry that is always down
struct UnreachableOracle;

#[async_trait]
impl OwnershipOracle for UnreachableOracle {
    async fn lookup(
        &self,
        _wallet: &WalletAddress,
        _property_id: PropertyId,
    ) -> OwnershipResult<OwnershipStatus> {
        Err(OwnershipError::Unreachable("registry offline".to_string()))
    }

    async fn claim_free_week(
        &self,
        _wallet: &WalletAddress,
        _property_id: PropertyId,
    ) -> OwnershipResult<()> {
        Err(OwnershipError::Unreachable("registry offline".to_string()))
    }

    async fn release_free_week(
        &self,
        _wallet: &WalletAddress,
        _property_id: PropertyId,
    ) -> OwnershipResult<()> {
        Err(OwnershipError::Unreachable("registry offline".to_string()))
    }
}

/// Registry whose lookups wait for a second caller, so both see the same entitlement
struct PairedLookupOracle {
    inner: Arc<InMemoryOwnershipOracle>,
    barrier: Barrier,
}

#[async_trait]
impl OwnershipOracle for PairedLookupOracle {
    async fn lookup(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<OwnershipStatus> {
        let status = self.inner.lookup(wallet, property_id).await;
        rendezvous(Some(&self.barrier)).await;
        status
    }

    async fn claim_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()> {
        self.inner.claim_free_week(wallet, property_id).await
    }

    async fn release_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()> {
        self.inner.release_free_week(wallet, property_id).await
    }
}

struct Harness {
    manager: BookingManager,
    bookings: Arc<InMemoryBookingRepository>,
    ownership: Arc<InMemoryOwnershipOracle>,
    gateway: Arc<ScriptedGateway>,
    feed: Arc<PriceFeed>,
}

async fn harness_with(gateway: ScriptedGateway, oracle: Option<Arc<dyn OwnershipOracle>>) -> Harness {
    let mut closed = Property::new(2, "Closed Loft", "Porto", 200.0, 2);
    closed.is_active = false;
    let properties = Arc::new(InMemoryPropertyRepository::with_properties([
        Property::new(1, "Villa Azul", "Lisbon", 450.0, 8),
        closed,
    ]));
    let bookings = Arc::new(InMemoryBookingRepository::new());
    let ownership = Arc::new(InMemoryOwnershipOracle::new());
    let gateway = Arc::new(gateway);
    let feed = Arc::new(PriceFeed::new(Vec::new()));

    let backends = BookingBackends {
        properties,
        bookings: bookings.clone(),
        ownership: match oracle {
            Some(oracle) => oracle,
            None => ownership.clone(),
        },
        payments: gateway.clone(),
        notifier: Arc::new(LogNotifier),
        price_feed: feed.clone(),
    };

    Harness {
        manager: BookingManager::new(backends, BookingPolicy::default()),
        bookings,
        ownership,
        gateway,
        feed,
    }
}

async fn harness() -> Harness {
    harness_with(ScriptedGateway::default(), None).await
}

async fn set_price(feed: &PriceFeed, price: f64, at: DateTime<Utc>) {
    feed.record(HktPriceSnapshot {
        price,
        price_change_24h: None,
        market_cap: None,
        volume_24h: None,
        total_supply: None,
        last_updated: at,
        source: "test".to_string(),
    })
    .await
    .unwrap();
}

fn price_request(check_in: NaiveDate, check_out: NaiveDate, guests: u32, currency: Currency) -> CalculatePriceRequest {
    CalculatePriceRequest {
        property_id: 1,
        check_in,
        check_out,
        guests,
        currency,
    }
}

fn booking_request(key: Option<&str>) -> CreateBookingRequest {
    CreateBookingRequest {
        property_id: 1,
        check_in: date(2025, 3, 1),
        check_out: date(2025, 3, 8),
        guests: 2,
        payment_source: "tok_visa".to_string(),
        guest_email: Some("guest@example.com".to_string()),
        quoted_total_usd: None,
        idempotency_key: key.map(str::to_string),
    }
}

fn owner() -> WalletAddress {
    WalletAddress::parse(OWNER).unwrap()
}

fn other_wallet() -> WalletAddress {
    WalletAddress::parse(OTHER).unwrap()
}

fn stay(key: &str, check_in: NaiveDate, check_out: NaiveDate) -> CreateBookingRequest {
    CreateBookingRequest {
        check_in,
        check_out,
        ..booking_request(Some(key))
    }
}

fn successes(results: &[BookingResult<BookingConfirmation>]) -> Vec<&BookingConfirmation> {
    results.iter().filter_map(|r| r.as_ref().ok()).collect()
}

#[tokio::test]
async fn test_guest_quote_in_hkt() {
    let h = harness().await;
    set_price(&h.feed, 0.10, now()).await;

    let quote = h
        .manager
        .quote_at(&price_request(date(2025, 3, 1), date(2025, 3, 8), 4, Currency::Hkt), None, now())
        .await
        .unwrap();

    assert_eq!(quote.nights, 7);
    assert_eq!(quote.base_price, 3150.0);
    assert_eq!(quote.total_usd, 3240.0);
    assert!((quote.total_hkt.unwrap() - 32_400.0).abs() < 1e-6);
    assert_eq!(quote.hkt_rate, Some(0.10));
    assert!(!quote.is_owner_booking);
}

#[tokio::test]
async fn test_owner_quote_is_cleaning_fee_only() {
    let h = harness().await;
    h.ownership.grant(owner(), 1, 3, false).await;

    let quote = h
        .manager
        .quote_at(
            &price_request(date(2025, 3, 1), date(2025, 3, 8), 2, Currency::Usd),
            Some(&owner()),
            now(),
        )
        .await
        .unwrap();

    assert!(quote.is_owner_booking);
    assert_eq!(quote.total_usd, 90.0);
}

#[tokio::test]
async fn test_used_free_week_pays_full_price() {
    let h = harness().await;
    h.ownership.grant(owner(), 1, 3, true).await;

    let quote = h
        .manager
        .quote_at(
            &price_request(date(2025, 3, 1), date(2025, 3, 8), 2, Currency::Usd),
            Some(&owner()),
            now(),
        )
        .await
        .unwrap();

    assert!(!quote.is_owner_booking);
    assert_eq!(quote.total_usd, 3240.0);
}

#[tokio::test]
async fn test_four_night_stay_reports_shortfall() {
    let h = harness().await;

    let err = h
        .manager
        .quote_at(&price_request(date(2025, 1, 10), date(2025, 1, 14), 2, Currency::Usd), None, now())
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::MinimumStay { shortfall: 3, .. }));
    assert!(err.is_validation());
    assert!(err.client_message().contains("Minimum stay is 7 nights"));
}

#[tokio::test]
async fn test_too_many_guests() {
    let h = harness().await;

    let err = h
        .manager
        .quote_at(&price_request(date(2025, 3, 1), date(2025, 3, 8), 9, Currency::Usd), None, now())
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::TooManyGuests { max_guests: 8, requested: 9 }));
    assert!(err.client_message().contains("Maximum 8 guests"));
}

#[tokio::test]
async fn test_unknown_and_inactive_properties() {
    let h = harness().await;
    let mut request = price_request(date(2025, 3, 1), date(2025, 3, 8), 1, Currency::Usd);

    request.property_id = 99;
    assert!(matches!(
        h.manager.quote_at(&request, None, now()).await,
        Err(BookingError::PropertyNotFound(99))
    ));

    request.property_id = 2;
    assert!(matches!(
        h.manager.quote_at(&request, None, now()).await,
        Err(BookingError::PropertyInactive(2))
    ));
}

#[tokio::test]
async fn test_hkt_quote_without_price_is_unavailable() {
    let h = harness().await;

    let err = h
        .manager
        .quote_at(&price_request(date(2025, 3, 1), date(2025, 3, 8), 2, Currency::Hkt), None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::PriceUnavailable));
}

#[tokio::test]
async fn test_stale_rate_is_not_used() {
    let h = harness().await;
    set_price(&h.feed, 0.10, now() - Duration::hours(2)).await;

    let usd = h
        .manager
        .quote_at(&price_request(date(2025, 3, 1), date(2025, 3, 8), 2, Currency::Usd), None, now())
        .await
        .unwrap();
    assert!(usd.total_hkt.is_none());
    assert!(usd.hkt_rate.is_none());

    let hkt = h
        .manager
        .quote_at(&price_request(date(2025, 3, 1), date(2025, 3, 8), 2, Currency::Hkt), None, now())
        .await;
    assert!(matches!(hkt, Err(BookingError::PriceUnavailable)));
}

#[tokio::test]
async fn test_ownership_failure_reads_as_no_ownership() {
    let oracle: Arc<dyn OwnershipOracle> = Arc::new(UnreachableOracle);
    let h = harness_with(ScriptedGateway::default(), Some(oracle)).await;

    let quote = h
        .manager
        .quote_at(
            &price_request(date(2025, 3, 1), date(2025, 3, 8), 2, Currency::Usd),
            Some(&owner()),
            now(),
        )
        .await
        .unwrap();

    assert!(!quote.is_owner_booking);
    assert_eq!(quote.total_usd, 3240.0);
}

#[tokio::test]
async fn test_card_booking_is_charged_and_stored() {
    let h = harness().await;

    let confirmation = h
        .manager
        .submit_at(&booking_request(Some("key-1")), PaymentMethod::Card, None, now())
        .await
        .unwrap();

    assert!(!confirmation.replayed);
    let booking = confirmation.booking;
    assert!(booking.reference.starts_with("HK-"));
    assert_eq!(booking.total_usd, 3240.0);
    assert_eq!(booking.payment_reference, "ch_1");
    assert_eq!(booking.idempotency_key, "key-1");
    assert_eq!(h.bookings.len().await, 1);

    let charges = h.gateway.charges.lock().unwrap();
    assert_eq!(charges[0].amount, 3240.0);
    assert_eq!(charges[0].currency, Currency::Usd);
    assert_eq!(charges[0].idempotency_key, "key-1");
}

#[tokio::test]
async fn test_resubmission_with_same_key_is_replayed() {
    let h = harness().await;
    let request = booking_request(Some("retry-key"));

    let first = h
        .manager
        .submit_at(&request, PaymentMethod::Card, None, now())
        .await
        .unwrap();
    let second = h
        .manager
        .submit_at(&request, PaymentMethod::Card, None, now())
        .await
        .unwrap();

    assert!(second.replayed);
    assert_eq!(first.booking.id, second.booking.id);
    assert_eq!(h.bookings.len().await, 1);
    assert_eq!(h.gateway.charge_count(), 1);
}

#[tokio::test]
async fn test_resubmission_without_key_is_replayed() {
    let h = harness().await;

    let first = h
        .manager
        .submit_at(&booking_request(None), PaymentMethod::Card, None, now())
        .await
        .unwrap();
    let second = h
        .manager
        .submit_at(&booking_request(None), PaymentMethod::Card, None, now())
        .await
        .unwrap();

    assert!(second.replayed);
    assert_eq!(first.booking.reference, second.booking.reference);
    assert_eq!(h.gateway.charge_count(), 1);
}

#[tokio::test]
async fn test_overlapping_dates_rejected() {
    let h = harness().await;
    h.manager
        .submit_at(&booking_request(Some("a")), PaymentMethod::Card, None, now())
        .await
        .unwrap();

    let mut overlapping = booking_request(Some("b"));
    overlapping.check_in = date(2025, 3, 5);
    overlapping.check_out = date(2025, 3, 12);
    let err = h
        .manager
        .submit_at(&overlapping, PaymentMethod::Card, None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::DatesUnavailable));

    let mut adjacent = booking_request(Some("c"));
    adjacent.check_in = date(2025, 3, 8);
    adjacent.check_out = date(2025, 3, 15);
    assert!(
        h.manager
            .submit_at(&adjacent, PaymentMethod::Card, None, now())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_quote_mismatch_rejected_before_charging() {
    let h = harness().await;
    let mut request = booking_request(Some("k"));
    request.quoted_total_usd = Some(3000.0);

    let err = h
        .manager
        .submit_at(&request, PaymentMethod::Card, None, now())
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::QuoteMismatch { .. }));
    assert_eq!(h.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_hkt_booking_charges_token_amount() {
    let h = harness().await;
    set_price(&h.feed, 0.10, now()).await;

    let confirmation = h
        .manager
        .submit_at(&booking_request(Some("hkt")), PaymentMethod::HktTransfer, None, now())
        .await
        .unwrap();

    assert!((confirmation.booking.total_hkt.unwrap() - 32_400.0).abs() < 1e-6);
    let charges = h.gateway.charges.lock().unwrap();
    assert_eq!(charges[0].currency, Currency::Hkt);
    assert!((charges[0].amount - 32_400.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_hkt_booking_without_price_is_not_charged() {
    let h = harness().await;

    let err = h
        .manager
        .submit_at(&booking_request(Some("hkt")), PaymentMethod::HktTransfer, None, now())
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::PriceUnavailable));
    assert_eq!(h.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_payment_failure_stores_nothing() {
    let h = harness_with(
        ScriptedGateway::failing(PaymentError::Unavailable("503".to_string())),
        None,
    )
    .await;
    let request = booking_request(Some("flaky"));

    let err = h
        .manager
        .submit_at(&request, PaymentMethod::Card, None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Payment(ref e) if e.is_transient()));
    assert!(h.bookings.is_empty().await);

    // The retried submission goes through once the gateway recovers
    let retried = h
        .manager
        .submit_at(&request, PaymentMethod::Card, None, now())
        .await
        .unwrap();
    assert!(!retried.replayed);
    assert_eq!(h.bookings.len().await, 1);
}

#[tokio::test]
async fn test_owner_booking_consumes_free_week() {
    let h = harness().await;
    h.ownership.grant(owner(), 1, 2, false).await;

    let confirmation = h
        .manager
        .submit_at(&booking_request(Some("owner")), PaymentMethod::Card, Some(&owner()), now())
        .await
        .unwrap();
    assert!(confirmation.booking.is_owner_booking);
    assert_eq!(confirmation.booking.total_usd, 90.0);

    let status = h.ownership.lookup(&owner(), 1).await.unwrap();
    assert!(status.has_used_free_week);

    let mine = h.manager.bookings_for_wallet(&owner()).await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_validation_before_payment() {
    let h = harness().await;

    let mut no_source = booking_request(Some("x"));
    no_source.payment_source = "  ".to_string();
    assert!(matches!(
        h.manager.submit_at(&no_source, PaymentMethod::Card, None, now()).await,
        Err(BookingError::MissingPaymentSource)
    ));

    let mut bad_email = booking_request(Some("y"));
    bad_email.guest_email = Some("not-an-email".to_string());
    assert!(matches!(
        h.manager.submit_at(&bad_email, PaymentMethod::Card, None, now()).await,
        Err(BookingError::InvalidEmail(_))
    ));

    assert_eq!(h.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_oversized_key_rejected_before_payment() {
    let h = harness().await;

    let long_key = "k".repeat(256);
    let err = h
        .manager
        .submit_at(&booking_request(Some(&long_key)), PaymentMethod::Card, None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::FieldTooLong { field: "idempotencyKey", max: 255 }));

    let mut long_email = booking_request(Some("z"));
    long_email.guest_email = Some(format!("{}@example.com", "g".repeat(320)));
    let err = h
        .manager
        .submit_at(&long_email, PaymentMethod::Card, None, now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::FieldTooLong { field: "guestEmail", .. }));

    assert_eq!(h.gateway.charge_count(), 0);
    assert!(h.bookings.is_empty().await);
}

#[tokio::test]
async fn test_reused_key_for_different_request_is_rejected() {
    let h = harness().await;
    set_price(&h.feed, 0.10, now()).await;

    h.manager
        .submit_at(&booking_request(Some("k1")), PaymentMethod::Card, Some(&owner()), now())
        .await
        .unwrap();

    let mut other = stay("k1", date(2025, 6, 1), date(2025, 6, 20));
    other.guest_email = None;
    other.payment_source = "0xabc".to_string();
    let err = h
        .manager
        .submit_at(&other, PaymentMethod::HktTransfer, Some(&other_wallet()), now())
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::IdempotencyKeyReused));
    assert!(!err.client_message().contains("guest@example.com"));
    assert_eq!(h.gateway.charge_count(), 1);
    assert!(h.manager.bookings_for_wallet(&other_wallet()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_same_dates_charge_once() {
    let h = harness_with(ScriptedGateway::paired(), None).await;
    let first = booking_request(Some("a"));
    let second = booking_request(Some("b"));

    let (a, b) = tokio::join!(
        h.manager.submit_at(&first, PaymentMethod::Card, None, now()),
        h.manager.submit_at(&second, PaymentMethod::Card, None, now()),
    );
    let results = [a, b];

    assert_eq!(successes(&results).len(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(BookingError::DatesUnavailable)))
    );
    assert_eq!(h.bookings.len().await, 1);
    assert_eq!(h.gateway.charge_count(), 1);
}

#[tokio::test]
async fn test_concurrent_owner_submissions_redeem_free_week_once() {
    let registry = Arc::new(InMemoryOwnershipOracle::new());
    registry.grant(owner(), 1, 3, false).await;
    let oracle: Arc<dyn OwnershipOracle> = Arc::new(PairedLookupOracle {
        inner: registry.clone(),
        barrier: Barrier::new(2),
    });
    let h = harness_with(ScriptedGateway::paired(), Some(oracle)).await;

    let march = stay("march", date(2025, 3, 1), date(2025, 3, 8));
    let april = stay("april", date(2025, 4, 1), date(2025, 4, 8));
    let owner_id = owner();
    let (a, b) = tokio::join!(
        h.manager.submit_at(&march, PaymentMethod::Card, Some(&owner_id), now()),
        h.manager.submit_at(&april, PaymentMethod::Card, Some(&owner_id), now()),
    );
    let results = [a, b];

    let booked = successes(&results);
    assert_eq!(booked.len(), 1);
    assert!(booked[0].booking.is_owner_booking);
    assert_eq!(booked[0].booking.total_usd, 90.0);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(BookingError::FreeWeekUnavailable(1))))
    );

    let charges = h.gateway.charges.lock().unwrap().clone();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, 90.0);
    assert_eq!(h.bookings.len().await, 1, "losing reservation is released");
    assert!(registry.lookup(&owner(), 1).await.unwrap().has_used_free_week);
}

#[tokio::test]
async fn test_failed_owner_charge_hands_back_free_week() {
    let h = harness_with(
        ScriptedGateway::failing(PaymentError::Declined("insufficient funds".to_string())),
        None,
    )
    .await;
    h.ownership.grant(owner(), 1, 1, false).await;

    let err = h
        .manager
        .submit_at(&booking_request(Some("owner")), PaymentMethod::Card, Some(&owner()), now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Payment(PaymentError::Declined(_))));
    assert!(h.ownership.has_free_week(&owner(), 1).await.unwrap());
    assert!(h.bookings.is_empty().await);

    let retried = h
        .manager
        .submit_at(&booking_request(Some("owner-2")), PaymentMethod::Card, Some(&owner()), now())
        .await
        .unwrap();
    assert!(retried.booking.is_owner_booking);
}

#[tokio::test]
async fn test_retry_while_first_attempt_is_charging() {
    let h = harness_with(ScriptedGateway::paired(), None).await;
    let request = booking_request(Some("slow"));

    let (first, retry) = tokio::join!(
        h.manager.submit_at(&request, PaymentMethod::Card, None, now()),
        h.manager.submit_at(&request, PaymentMethod::Card, None, now()),
    );
    let results = [first, retry];

    let booked = successes(&results);
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].booking.status, BookingStatus::Confirmed);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(BookingError::SubmissionInProgress)))
    );
    assert_eq!(h.gateway.charge_count(), 1);

    let replay = h
        .manager
        .submit_at(&request, PaymentMethod::Card, None, now())
        .await
        .unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.booking.id, booked[0].booking.id);
}
