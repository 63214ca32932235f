//! HTTP API client for the HomeKrypto booking service.

use homekrypto::booking::models::{
    Booking, CalculatePriceRequest, CreateBookingRequest, PaymentMethod, PriceQuote,
};
use homekrypto::property::PropertyId;
use homekrypto::{HktPriceSnapshot, OwnershipStatus, Property, WalletAddress};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

const WALLET_HEADER: &str = "x-wallet-address";

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Timeout(_) | ClientError::Network(_) => true,
            ClientError::Status { status, .. } => matches!(status, 408 | 502 | 503 | 504),
            ClientError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Result of a booking submission
#[derive(Debug, Clone, Deserialize)]
pub struct BookingReceipt {
    pub booking: Booking,
    /// True when the server matched an earlier submission with the same key
    #[serde(default)]
    pub replayed: bool,
}

/// Wallet address and the session token proving it
#[derive(Clone)]
struct WalletSession {
    wallet: WalletAddress,
    token: String,
}

/// API client for the booking service
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    wallet: Option<WalletSession>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client for `base_url` with the default retry policy
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            wallet: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Send `X-Wallet-Address` and its wallet session token with every request
    pub fn with_wallet(mut self, wallet: WalletAddress, token: impl Into<String>) -> Self {
        self.wallet = Some(WalletSession {
            wallet,
            token: token.into(),
        });
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// List bookable properties
    pub async fn properties(&self) -> ClientResult<Vec<Property>> {
        self.retry
            .run("list properties", |_| self.get_json("/api/properties"))
            .await
    }

    /// Quote a stay
    pub async fn calculate_price(&self, request: &CalculatePriceRequest) -> ClientResult<PriceQuote> {
        self.retry
            .run("calculate price", |_| {
                self.post_json("/api/bookings/calculate-price", request)
            })
            .await
    }

    /// Shares held by the configured wallet in `property_id`
    pub async fn user_shares(&self, property_id: PropertyId) -> ClientResult<OwnershipStatus> {
        let path = format!("/api/bookings/user-shares/{}", property_id);
        self.retry
            .run("user shares", |_| self.get_json(&path))
            .await
    }

    /// Latest HKT price record
    pub async fn hkt_stats(&self) -> ClientResult<HktPriceSnapshot> {
        self.retry
            .run("hkt stats", |_| self.get_json("/api/hkt-stats"))
            .await
    }

    /// Bookings made by the configured wallet
    pub async fn my_bookings(&self) -> ClientResult<Vec<Booking>> {
        self.retry
            .run("my bookings", |_| self.get_json("/api/bookings/mine"))
            .await
    }

    /// Book and pay by card
    pub async fn create_card_booking(
        &self,
        request: CreateBookingRequest,
    ) -> ClientResult<BookingReceipt> {
        self.submit(PaymentMethod::Card, request).await
    }

    /// Book and pay by HKT transfer
    pub async fn create_hkt_booking(
        &self,
        request: CreateBookingRequest,
    ) -> ClientResult<BookingReceipt> {
        self.submit(PaymentMethod::HktTransfer, request).await
    }

    /// Submit a booking, retrying transient failures under one idempotency key.
    ///
    /// A key is generated when the request carries none, so a retry after a
    /// lost response returns the booking created by the first attempt.
    async fn submit(
        &self,
        method: PaymentMethod,
        mut request: CreateBookingRequest,
    ) -> ClientResult<BookingReceipt> {
        if request.idempotency_key.is_none() {
            request.idempotency_key = Some(uuid::Uuid::new_v4().to_string());
        }

        let path = match method {
            PaymentMethod::Card => "/api/bookings/create-stripe-booking",
            PaymentMethod::HktTransfer => "/api/bookings/create-hkt-booking",
        };

        let receipt: BookingReceipt = self
            .retry
            .run("booking submission", |attempt| {
                log::debug!("Submitting {} booking, attempt {}", method, attempt);
                self.post_json(path, &request)
            })
            .await?;

        if receipt.replayed {
            log::info!(
                "Booking {} was already recorded, returning it",
                receipt.booking.reference
            );
        }
        Ok(receipt)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.wallet {
            Some(session) => builder
                .header(WALLET_HEADER, session.wallet.as_str())
                .bearer_auth(&session.token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let builder = self.client.get(format!("{}{}", self.base_url, path));
        let response = self.request(builder).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        let response = self.request(builder).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| ClientError::Decode(e.to_string()));
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
