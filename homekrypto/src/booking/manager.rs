//! Booking manager: quotes stays and submits paid bookings.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{BookingError, BookingResult};
use super::models::{
    Booking, BookingConfirmation, BookingStatus, CalculatePriceRequest, CreateBookingRequest,
    Currency, PaymentMethod, PriceQuote, generate_reference,
};
use super::nights::{StayPolicy, count_nights};
use super::pricing::{compose_price, convert_to_hkt, validate_guests};
use crate::db::StorageError;
use crate::db::repository::{BookingRepository, InsertOutcome, PropertyRepository};
use crate::notify::{Notifier, notify_quietly};
use crate::ownership::{OwnershipError, OwnershipOracle, OwnershipStatus, WalletAddress};
use crate::payment::{ChargeRequest, PaymentGateway};
use crate::price_feed::{HktRate, PriceFeed};
use crate::property::{Property, PropertyId};

/// Largest accepted gap between a client-side quote and the server total
pub const QUOTE_TOLERANCE_USD: f64 = 0.01;

/// Default maximum age of an HKT rate used for pricing
pub const DEFAULT_RATE_MAX_AGE_SECS: i64 = 30 * 60;

/// Column limits of the bookings table
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 320;
pub const MAX_PAYMENT_SOURCE_LEN: usize = 255;

/// Booking rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    pub stay: StayPolicy,
    /// Rates older than this are treated as unavailable
    pub rate_max_age: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            stay: StayPolicy::default(),
            rate_max_age: Duration::seconds(DEFAULT_RATE_MAX_AGE_SECS),
        }
    }
}

/// Collaborators of the booking manager
#[derive(Clone)]
pub struct BookingBackends {
    pub properties: Arc<dyn PropertyRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub ownership: Arc<dyn OwnershipOracle>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub price_feed: Arc<PriceFeed>,
}

/// Booking manager
#[derive(Clone)]
pub struct BookingManager {
    properties: Arc<dyn PropertyRepository>,
    bookings: Arc<dyn BookingRepository>,
    ownership: Arc<dyn OwnershipOracle>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    price_feed: Arc<PriceFeed>,
    policy: BookingPolicy,
}

impl BookingManager {
    /// Create a new booking manager
    pub fn new(backends: BookingBackends, policy: BookingPolicy) -> Self {
        Self {
            properties: backends.properties,
            bookings: backends.bookings,
            ownership: backends.ownership,
            payments: backends.payments,
            notifier: backends.notifier,
            price_feed: backends.price_feed,
            policy,
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn price_feed(&self) -> &Arc<PriceFeed> {
        &self.price_feed
    }

    /// Get a property by ID, active or not
    ///
    /// # Errors
    ///
    /// * `BookingError::PropertyNotFound` - No such property
    pub async fn get_property(&self, property_id: PropertyId) -> BookingResult<Property> {
        self.properties
            .get_property(property_id)
            .await?
            .ok_or(BookingError::PropertyNotFound(property_id))
    }

    /// List bookable properties
    pub async fn list_properties(&self) -> BookingResult<Vec<Property>> {
        Ok(self.properties.list_active().await?)
    }

    /// Ownership of `wallet` for `property_id`; registry failures read as no ownership
    pub async fn ownership_status(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipStatus {
        match self.ownership.lookup(wallet, property_id).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!(
                    "Ownership lookup failed for {} on property {}, pricing without discount: {}",
                    wallet,
                    property_id,
                    e
                );
                OwnershipStatus::none()
            }
        }
    }

    /// Quote a stay at the current time
    pub async fn quote(
        &self,
        request: &CalculatePriceRequest,
        wallet: Option<&WalletAddress>,
    ) -> BookingResult<PriceQuote> {
        self.quote_at(request, wallet, Utc::now()).await
    }

    /// Quote a stay as of `now`
    ///
    /// # Errors
    ///
    /// * `BookingError::PropertyNotFound` / `PropertyInactive` - Property cannot be booked
    /// * Date and guest validation errors from [`count_nights`] and [`validate_guests`]
    /// * `BookingError::PriceUnavailable` - HKT quote requested without a usable rate
    pub async fn quote_at(
        &self,
        request: &CalculatePriceRequest,
        wallet: Option<&WalletAddress>,
        now: DateTime<Utc>,
    ) -> BookingResult<PriceQuote> {
        let property = self.get_property(request.property_id).await?;
        if !property.is_active {
            return Err(BookingError::PropertyInactive(property.id));
        }

        let nights = count_nights(
            request.check_in,
            request.check_out,
            now.date_naive(),
            &self.policy.stay,
        )?;
        validate_guests(request.guests, property.max_guests)?;

        let ownership = match wallet {
            Some(wallet) => self.ownership_status(wallet, property.id).await,
            None => OwnershipStatus::none(),
        };
        let price = compose_price(&property, nights, &ownership)?;

        let rate = self.usable_rate(now).await;
        let total_hkt = match request.currency {
            Currency::Hkt => Some(convert_to_hkt(price.total_usd, rate.as_ref())?),
            Currency::Usd => rate
                .as_ref()
                .and_then(|r| convert_to_hkt(price.total_usd, Some(r)).ok()),
        };
        let rate = rate.filter(|_| total_hkt.is_some());

        log::debug!(
            "Quoted property {} for {} nights: {:.2} USD (owner: {})",
            property.id,
            nights,
            price.total_usd,
            price.is_owner_booking
        );

        Ok(PriceQuote {
            property_id: property.id,
            nights,
            guests: request.guests,
            nightly_rate: price.nightly_rate,
            base_price: price.base_price,
            cleaning_fee: price.cleaning_fee,
            total_usd: price.total_usd,
            total_hkt,
            currency: request.currency,
            is_owner_booking: price.is_owner_booking,
            hkt_rate: rate.as_ref().map(|r| r.usd_per_hkt),
            rate_fetched_at: rate.as_ref().map(|r| r.fetched_at),
        })
    }

    /// Submit a booking at the current time
    pub async fn submit(
        &self,
        request: &CreateBookingRequest,
        method: PaymentMethod,
        wallet: Option<&WalletAddress>,
    ) -> BookingResult<BookingConfirmation> {
        self.submit_at(request, method, wallet, Utc::now()).await
    }

    /// Reserve, charge and confirm a booking as of `now`
    ///
    /// The stay is first written as a pending booking, which holds its nights
    /// and its idempotency key, and an owner's free week is claimed. Only then
    /// is the payment taken; a failed charge releases both. A request whose
    /// idempotency key matches an earlier identical submission returns that
    /// booking with `replayed = true` and charges nothing.
    ///
    /// # Errors
    ///
    /// * Every error of [`BookingManager::quote_at`]
    /// * `BookingError::FieldTooLong` - Key, email or payment source exceeds storage limits
    /// * `BookingError::IdempotencyKeyReused` - Key belongs to a different submission
    /// * `BookingError::SubmissionInProgress` - Earlier submission under the key is still charging
    /// * `BookingError::QuoteMismatch` - `quoted_total_usd` disagrees with the server total
    /// * `BookingError::DatesUnavailable` - Dates overlap a pending or confirmed booking
    /// * `BookingError::FreeWeekUnavailable` - Owner price quoted but the free week is gone
    /// * `BookingError::Payment` - Payment gateway failure
    pub async fn submit_at(
        &self,
        request: &CreateBookingRequest,
        method: PaymentMethod,
        wallet: Option<&WalletAddress>,
        now: DateTime<Utc>,
    ) -> BookingResult<BookingConfirmation> {
        let payment_source = request.payment_source.trim();
        if payment_source.is_empty() {
            return Err(BookingError::MissingPaymentSource);
        }
        check_length("paymentSource", payment_source, MAX_PAYMENT_SOURCE_LEN)?;
        let guest_email = request
            .guest_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(validate_email)
            .transpose()?;

        let fingerprint = request_fingerprint(request, method, wallet);
        let idempotency_key = match request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        {
            Some(key) => {
                check_length("idempotencyKey", key, MAX_IDEMPOTENCY_KEY_LEN)?;
                key.to_string()
            }
            None => format!("derived-{fingerprint}"),
        };

        if let Some(existing) = self.bookings.find_by_idempotency_key(&idempotency_key).await? {
            return replay(existing, &fingerprint);
        }

        let quote = self
            .quote_at(&request.price_request(method.currency()), wallet, now)
            .await?;

        if let Some(quoted) = request.quoted_total_usd {
            if (quoted - quote.total_usd).abs() > QUOTE_TOLERANCE_USD {
                return Err(BookingError::QuoteMismatch {
                    quoted,
                    actual: quote.total_usd,
                });
            }
        }

        let amount = match method {
            PaymentMethod::Card => quote.total_usd,
            PaymentMethod::HktTransfer => quote.total_hkt.ok_or(BookingError::PriceUnavailable)?,
        };

        let id = Uuid::new_v4();
        let reservation = Booking {
            id,
            reference: generate_reference(&id),
            property_id: quote.property_id,
            wallet_address: wallet.cloned(),
            guest_email,
            check_in: request.check_in,
            check_out: request.check_out,
            guests: quote.guests,
            nights: quote.nights,
            total_usd: quote.total_usd,
            total_hkt: quote.total_hkt,
            hkt_rate: quote.hkt_rate,
            payment_method: method,
            payment_reference: String::new(),
            is_owner_booking: quote.is_owner_booking,
            idempotency_key,
            request_fingerprint: fingerprint,
            status: BookingStatus::Pending,
            created_at: now,
        };

        match self.bookings.insert(&reservation).await? {
            InsertOutcome::Inserted(_) => {}
            InsertOutcome::Duplicate(existing) => {
                log::info!(
                    "Concurrent submission for key {} resolved to booking {}",
                    existing.idempotency_key,
                    existing.reference
                );
                return replay(existing, &reservation.request_fingerprint);
            }
            InsertOutcome::Overlap => return Err(BookingError::DatesUnavailable),
        }

        let owner = wallet.filter(|_| quote.is_owner_booking);
        if let Some(owner) = owner {
            if let Err(e) = self.ownership.claim_free_week(owner, quote.property_id).await {
                self.release_reservation(&reservation).await;
                return Err(match e {
                    OwnershipError::NoFreeWeek { property_id } => {
                        log::info!("Free week for {} on property {} already taken", owner, property_id);
                        BookingError::FreeWeekUnavailable(property_id)
                    }
                    other => other.into(),
                });
            }
        }

        let charged = self
            .payments
            .charge(&ChargeRequest {
                idempotency_key: reservation.idempotency_key.clone(),
                method,
                amount,
                currency: method.currency(),
                source: payment_source.to_string(),
                description: format!(
                    "HomeKrypto stay at property {} ({} nights from {})",
                    quote.property_id, quote.nights, request.check_in
                ),
            })
            .await;

        let receipt = match charged {
            Ok(receipt) => receipt,
            Err(e) => {
                if e.is_transient() {
                    log::warn!("Charge for {} failed, safe to retry: {}", reservation.idempotency_key, e);
                } else {
                    log::info!("Charge for {} refused: {}", reservation.idempotency_key, e);
                }
                if let Some(owner) = owner {
                    self.release_free_week(owner, quote.property_id).await;
                }
                self.release_reservation(&reservation).await;
                return Err(e.into());
            }
        };

        let booking = match self.bookings.confirm(id, &receipt.reference).await {
            Ok(Some(booking)) => booking,
            Ok(None) => {
                log::error!(
                    "Payment {} captured but pending booking {} was gone",
                    receipt.reference,
                    reservation.reference
                );
                return Err(StorageError::Database(sqlx::Error::RowNotFound).into());
            }
            Err(e) => {
                log::error!(
                    "Payment {} captured but booking {} could not be confirmed: {}",
                    receipt.reference,
                    reservation.reference,
                    e
                );
                return Err(e.into());
            }
        };

        log::info!(
            "Booking {} confirmed: property {}, {} nights, {:.2} USD via {}",
            booking.reference,
            booking.property_id,
            booking.nights,
            booking.total_usd,
            booking.payment_method
        );

        notify_quietly(self.notifier.as_ref(), &booking).await;

        Ok(BookingConfirmation {
            booking,
            replayed: false,
        })
    }

    async fn release_reservation(&self, reservation: &Booking) {
        if let Err(e) = self.bookings.release(reservation.id).await {
            log::error!(
                "Pending booking {} could not be released: {}",
                reservation.reference,
                e
            );
        }
    }

    async fn release_free_week(&self, wallet: &WalletAddress, property_id: PropertyId) {
        if let Err(e) = self.ownership.release_free_week(wallet, property_id).await {
            log::error!(
                "Free week of {} on property {} could not be handed back: {}",
                wallet,
                property_id,
                e
            );
        }
    }

    /// Bookings made by `wallet`, newest first
    pub async fn bookings_for_wallet(&self, wallet: &WalletAddress) -> BookingResult<Vec<Booking>> {
        Ok(self.bookings.list_by_wallet(wallet).await?)
    }

    async fn usable_rate(&self, now: DateTime<Utc>) -> Option<HktRate> {
        let rate = self.price_feed.current_rate().await?;
        if rate.is_stale(now, self.policy.rate_max_age) {
            log::warn!(
                "Ignoring HKT rate from {} fetched at {}: older than {}s",
                rate.source,
                rate.fetched_at,
                self.policy.rate_max_age.num_seconds()
            );
            return None;
        }
        Some(rate)
    }
}

/// Answer to a submission whose key already has a booking
fn replay(existing: Booking, fingerprint: &str) -> BookingResult<BookingConfirmation> {
    if existing.request_fingerprint != fingerprint {
        log::warn!(
            "Idempotency key {} reused for a different submission",
            existing.idempotency_key
        );
        return Err(BookingError::IdempotencyKeyReused);
    }
    if existing.status == BookingStatus::Pending {
        return Err(BookingError::SubmissionInProgress);
    }

    log::info!(
        "Replaying booking {} for idempotency key {}",
        existing.reference,
        existing.idempotency_key
    );
    Ok(BookingConfirmation {
        booking: existing,
        replayed: true,
    })
}

/// Derive an idempotency key from the submission's identifying fields
///
/// Used when the client sends no key, so an identical resubmission after a
/// timeout still resolves to the first booking.
pub fn derive_idempotency_key(
    request: &CreateBookingRequest,
    method: PaymentMethod,
    wallet: Option<&WalletAddress>,
) -> String {
    format!("derived-{}", request_fingerprint(request, method, wallet))
}

/// SHA-256 hex over caller wallet, property, dates, guests, method and payment source
pub fn request_fingerprint(
    request: &CreateBookingRequest,
    method: PaymentMethod,
    wallet: Option<&WalletAddress>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(wallet.map(WalletAddress::as_str).unwrap_or("anonymous"));
    hasher.update(b"|");
    hasher.update(request.property_id.to_string());
    hasher.update(b"|");
    hasher.update(request.check_in.to_string());
    hasher.update(b"|");
    hasher.update(request.check_out.to_string());
    hasher.update(b"|");
    hasher.update(request.guests.to_string());
    hasher.update(b"|");
    hasher.update(method.to_string());
    hasher.update(b"|");
    hasher.update(request.payment_source.trim());
    hex::encode(hasher.finalize())
}

fn check_length(field: &'static str, value: &str, max: usize) -> BookingResult<()> {
    if value.chars().count() > max {
        return Err(BookingError::FieldTooLong { field, max });
    }
    Ok(())
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain
fn validate_email(email: &str) -> BookingResult<String> {
    check_length("guestEmail", email, MAX_EMAIL_LEN)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email.to_string())
    } else {
        Err(BookingError::InvalidEmail(email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            property_id: 1,
            check_in: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            guests: 2,
            payment_source: "tok_visa".to_string(),
            guest_email: None,
            quoted_total_usd: None,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_derived_key_is_stable() {
        let a = derive_idempotency_key(&request(), PaymentMethod::Card, None);
        let b = derive_idempotency_key(&request(), PaymentMethod::Card, None);
        assert_eq!(a, b);
        assert!(a.starts_with("derived-"));
        assert_eq!(a.len(), "derived-".len() + 64);
    }

    #[test]
    fn test_derived_key_depends_on_submission() {
        let base = derive_idempotency_key(&request(), PaymentMethod::Card, None);

        let mut other_dates = request();
        other_dates.check_out = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_ne!(base, derive_idempotency_key(&other_dates, PaymentMethod::Card, None));
        assert_ne!(base, derive_idempotency_key(&request(), PaymentMethod::HktTransfer, None));

        let wallet = WalletAddress::parse("0x2222222222222222222222222222222222222222").unwrap();
        assert_ne!(
            base,
            derive_idempotency_key(&request(), PaymentMethod::Card, Some(&wallet))
        );
    }

    #[test]
    fn test_fingerprint_backs_derived_key() {
        let fingerprint = request_fingerprint(&request(), PaymentMethod::Card, None);
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(
            derive_idempotency_key(&request(), PaymentMethod::Card, None),
            format!("derived-{fingerprint}")
        );
    }

    #[test]
    fn test_oversized_fields_are_rejected() {
        let long_email = format!("{}@example.com", "g".repeat(MAX_EMAIL_LEN));
        assert!(matches!(
            validate_email(&long_email),
            Err(BookingError::FieldTooLong { field: "guestEmail", max: MAX_EMAIL_LEN })
        ));

        let key = "k".repeat(MAX_IDEMPOTENCY_KEY_LEN);
        assert!(check_length("idempotencyKey", &key, MAX_IDEMPOTENCY_KEY_LEN).is_ok());
        let err = check_length("idempotencyKey", &format!("{key}k"), MAX_IDEMPOTENCY_KEY_LEN)
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "idempotencyKey must be at most 255 characters");
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("guest@example.com").is_ok());
        for bad in ["guest", "@example.com", "guest@example", "a@b@c.com", "guest@.com", "g uest@x.com"] {
            assert!(
                matches!(validate_email(bad), Err(BookingError::InvalidEmail(_))),
                "{bad} should be rejected"
            );
        }
    }
}
