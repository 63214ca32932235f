//! Payment gateway trait and HTTP implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::{PaymentError, PaymentResult};
use crate::booking::models::{Currency, PaymentMethod};

/// Charge submitted to the payment processor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    /// Forwarded to the processor so a retried charge is not applied twice
    pub idempotency_key: String,
    pub method: PaymentMethod,
    pub amount: f64,
    pub currency: Currency,
    /// Card token or transfer transaction hash
    pub source: String,
    pub description: String,
}

/// Successful charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Processor-side charge or transfer reference
    pub reference: String,
    pub amount: f64,
    pub currency: Currency,
    pub processed_at: DateTime<Utc>,
}

/// Card processor or on-chain settlement service
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> PaymentResult<PaymentReceipt>;
}

/// Gateway used when no processor is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPaymentGateway;

#[async_trait]
impl PaymentGateway for DisabledPaymentGateway {
    async fn charge(&self, _request: &ChargeRequest) -> PaymentResult<PaymentReceipt> {
        Err(PaymentError::NotConfigured)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayCharge {
    id: String,
    status: String,
    #[serde(default)]
    failure_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// JSON-over-HTTP payment processor
///
/// Posts charges to `{base_url}/v1/charges` with the booking's idempotency
/// key in the `Idempotency-Key` header.
pub struct HttpPaymentGateway {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpPaymentGateway {
    /// Create a gateway client
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest` error if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> PaymentError {
        if err.is_timeout() {
            PaymentError::Timeout(self.timeout)
        } else {
            PaymentError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, request: &ChargeRequest) -> PaymentResult<PaymentReceipt> {
        let mut builder = self
            .client
            .post(format!("{}/v1/charges", self.base_url))
            .header("Idempotency-Key", &request.idempotency_key)
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<GatewayErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.or(body.message))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(PaymentError::from_status(status.as_u16(), message));
        }

        let charge: GatewayCharge = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        match charge.status.as_str() {
            "succeeded" | "confirmed" => Ok(PaymentReceipt {
                reference: charge.id,
                amount: request.amount,
                currency: request.currency,
                processed_at: Utc::now(),
            }),
            "failed" | "declined" => Err(PaymentError::Declined(
                charge
                    .failure_message
                    .unwrap_or_else(|| "charge declined".to_string()),
            )),
            other => Err(PaymentError::InvalidResponse(format!(
                "charge {} in state {other}",
                charge.id
            ))),
        }
    }
}
