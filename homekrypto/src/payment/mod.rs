//! Payment gateway collaborator.
//!
//! Card charges and HKT transfer settlements both go through one
//! [`PaymentGateway`]. Failures are classified so callers can tell a
//! retryable outage ([`PaymentError::is_transient`]) from a permanent decline.

pub mod errors;
pub mod gateway;

pub use errors::{PaymentError, PaymentResult};
pub use gateway::{
    ChargeRequest, DisabledPaymentGateway, HttpPaymentGateway, PaymentGateway, PaymentReceipt,
};
