//! Error responses shared by the API handlers.

use axum::{Json, extract::rejection::JsonRejection, http::StatusCode};
use homekrypto::BookingError;
use homekrypto::payment::PaymentError;
use serde::Serialize;

/// Error body: `{"success": false, "error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Handler error type
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Build an error response
pub fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
        }),
    )
}

/// HTTP status for a booking error
pub fn booking_status(err: &BookingError) -> StatusCode {
    if err.is_validation() {
        return StatusCode::BAD_REQUEST;
    }

    match err {
        BookingError::PropertyNotFound(_) => StatusCode::NOT_FOUND,
        BookingError::PropertyInactive(_)
        | BookingError::DatesUnavailable
        | BookingError::FreeWeekUnavailable(_) => StatusCode::CONFLICT,
        BookingError::IdempotencyKeyReused => StatusCode::UNPROCESSABLE_ENTITY,
        // Retrying the same key resolves to the finished booking
        BookingError::SubmissionInProgress
        | BookingError::PriceUnavailable
        | BookingError::Ownership(_) => StatusCode::SERVICE_UNAVAILABLE,
        BookingError::Payment(e) => payment_status(e),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn payment_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
        PaymentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PaymentError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        // Permanent until redeployed, so not a retryable 503
        PaymentError::NotConfigured => StatusCode::NOT_IMPLEMENTED,
        PaymentError::Unavailable(_) | PaymentError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<BookingError> for ErrorResponse {
    fn from(err: BookingError) -> Self {
        Self {
            success: false,
            error: err.client_message(),
        }
    }
}

/// Map a booking error to its response, logging server-side failures
pub fn booking_error(err: BookingError) -> ApiError {
    let status = booking_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "Booking request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "Booking request rejected");
    }
    (status, Json(err.into()))
}

/// Map a malformed JSON body to a 400
pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    error(StatusCode::BAD_REQUEST, rejection.body_text())
}
