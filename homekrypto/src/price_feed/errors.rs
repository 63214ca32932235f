//! Price feed error types.

use thiserror::Error;

use crate::db::StorageError;

/// Price feed errors
#[derive(Debug, Error)]
pub enum PriceFeedError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} returned HTTP {status}")]
    UnexpectedStatus { provider: String, status: u16 },

    /// Provider body did not have the expected shape
    #[error("{provider} returned a malformed response: {reason}")]
    MalformedResponse { provider: String, reason: String },

    /// Provider reported a non-positive or non-finite price
    #[error("{provider} reported an invalid price: {price}")]
    InvalidPrice { provider: String, price: f64 },

    /// Every provider failed this cycle
    #[error("All price providers failed: {}", .0.join("; "))]
    AllProvidersFailed(Vec<String>),

    /// No providers configured
    #[error("No price providers configured")]
    NoProviders,

    /// Latest-price record could not be read
    #[error("Price storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for price feed operations
pub type PriceFeedResult<T> = Result<T, PriceFeedError>;
