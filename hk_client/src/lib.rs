//! Client library for the HomeKrypto booking API.
//!
//! [`api_client::ApiClient`] wraps every endpoint with typed requests and
//! responses. Calls go through a [`retry::RetryPolicy`] that retries only
//! transient failures, and booking submissions carry one idempotency key
//! across all attempts so a retry can never book twice.

pub mod api_client;
pub mod retry;

pub use api_client::{ApiClient, BookingReceipt, ClientError, ClientResult};
pub use retry::RetryPolicy;
