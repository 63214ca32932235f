//! Payment error types.

use std::time::Duration;
use thiserror::Error;

/// Payment errors
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Processor refused the charge
    #[error("Payment declined: {0}")]
    Declined(String),

    /// Processor rejected the request as malformed
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    /// No payment gateway configured
    #[error("Payment processing is not configured")]
    NotConfigured,

    /// Processor unreachable or overloaded
    #[error("Payment processor unavailable: {0}")]
    Unavailable(String),

    /// Processor did not answer in time
    #[error("Payment processor timed out after {0:?}")]
    Timeout(Duration),

    /// Processor answered with something we cannot interpret
    #[error("Unexpected payment processor response: {0}")]
    InvalidResponse(String),
}

impl PaymentError {
    /// Whether retrying the same charge may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PaymentError::Unavailable(_) | PaymentError::Timeout(_))
    }

    /// Map a processor HTTP status to an error
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            402 => PaymentError::Declined(message),
            408 | 429 | 500..=599 => PaymentError::Unavailable(format!("HTTP {status}: {message}")),
            _ => PaymentError::InvalidRequest(format!("HTTP {status}: {message}")),
        }
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            PaymentError::Unavailable(_) | PaymentError::Timeout(_) => {
                "payment processor temporarily unavailable".to_string()
            }
            PaymentError::InvalidResponse(_) => "payment status unknown".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
