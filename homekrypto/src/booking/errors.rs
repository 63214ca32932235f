//! Booking error types.

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::StorageError;
use crate::ownership::OwnershipError;
use crate::payment::PaymentError;
use crate::property::PropertyId;

/// Booking errors
#[derive(Debug, Error)]
pub enum BookingError {
    /// Check-in before today
    #[error("Check-in date {check_in} is in the past (today is {today})")]
    CheckInInPast { check_in: NaiveDate, today: NaiveDate },

    /// Check-out on or before check-in
    #[error("Check-out date {check_out} must be after check-in date {check_in}")]
    CheckOutNotAfterCheckIn {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    /// Stay shorter than the minimum
    #[error("Minimum stay is {min_nights} nights: requested {nights}, {shortfall} more needed")]
    MinimumStay {
        min_nights: u32,
        nights: u32,
        shortfall: u32,
    },

    /// Stay longer than the maximum
    #[error("Maximum stay is {max_nights} nights: requested {nights}")]
    MaximumStay { max_nights: u32, nights: u32 },

    /// Zero guests
    #[error("At least 1 guest is required")]
    TooFewGuests,

    /// More guests than the property allows
    #[error("Maximum {max_guests} guests allowed for this property, requested {requested}")]
    TooManyGuests { max_guests: u32, requested: u32 },

    /// Malformed guest email
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Empty card token or transaction hash
    #[error("Payment source is required")]
    MissingPaymentSource,

    /// Request field longer than storage accepts
    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    /// Idempotency key already used for a different submission
    #[error("Idempotency key was already used for a different booking request")]
    IdempotencyKeyReused,

    /// Earlier submission under the same key has not finished
    #[error("A booking with this idempotency key is still being processed, please retry shortly")]
    SubmissionInProgress,

    /// Property does not exist
    #[error("Property {0} not found")]
    PropertyNotFound(PropertyId),

    /// Property exists but is not bookable
    #[error("Property {0} is not accepting bookings")]
    PropertyInactive(PropertyId),

    /// Composed total is not a chargeable amount
    #[error("Invalid booking total: {0}")]
    InvalidTotal(f64),

    /// No usable HKT rate
    #[error("HKT price data unavailable, please retry shortly")]
    PriceUnavailable,

    /// Dates overlap a confirmed or pending booking
    #[error("Selected dates are no longer available")]
    DatesUnavailable,

    /// Owner price quoted but the free week was taken by another booking
    #[error("Free week for property {0} has already been used, please request a new quote")]
    FreeWeekUnavailable(PropertyId),

    /// Client-side total disagrees with the server quote
    #[error("Quoted total {quoted:.2} USD no longer matches current total {actual:.2} USD")]
    QuoteMismatch { quoted: f64, actual: f64 },

    /// Payment collaborator failure
    #[error("Payment failed: {0}")]
    Payment(#[from] PaymentError),

    /// Share registry failure while claiming the free week
    #[error("Ownership error: {0}")]
    Ownership(#[from] OwnershipError),

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl BookingError {
    /// Whether the caller sent an invalid request (never worth retrying)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::CheckInInPast { .. }
                | BookingError::CheckOutNotAfterCheckIn { .. }
                | BookingError::MinimumStay { .. }
                | BookingError::MaximumStay { .. }
                | BookingError::TooFewGuests
                | BookingError::TooManyGuests { .. }
                | BookingError::InvalidEmail(_)
                | BookingError::MissingPaymentSource
                | BookingError::FieldTooLong { .. }
                | BookingError::QuoteMismatch { .. }
        )
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BookingError::Storage(_) => "Internal server error".to_string(),
            BookingError::InvalidTotal(_) => "Unable to price this stay".to_string(),
            BookingError::Payment(e) => format!("Payment failed: {}", e.client_message()),
            BookingError::Ownership(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for booking operations
pub type BookingResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(BookingError::TooFewGuests.is_validation());
        assert!(!BookingError::PriceUnavailable.is_validation());
        assert!(!BookingError::DatesUnavailable.is_validation());
        assert!(
            BookingError::FieldTooLong {
                field: "idempotencyKey",
                max: 255
            }
            .is_validation()
        );
        assert!(!BookingError::IdempotencyKeyReused.is_validation());
    }

    #[test]
    fn test_registry_errors_are_sanitized() {
        let err = BookingError::Ownership(OwnershipError::Unreachable("10.0.0.7:5432".into()));
        assert_eq!(err.client_message(), "Ownership registry unavailable");
    }

    #[test]
    fn test_storage_errors_are_sanitized() {
        let err = BookingError::Storage(StorageError::Database(sqlx::Error::RowNotFound));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_price_unavailable_message() {
        assert!(
            BookingError::PriceUnavailable
                .to_string()
                .to_lowercase()
                .contains("price data unavailable")
        );
    }
}
