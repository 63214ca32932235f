//! Transactional notifications.
//!
//! Notifications are best effort. A failed confirmation email must never
//! fail the booking that triggered it, so callers go through
//! [`notify_quietly`], which logs and swallows errors.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::booking::models::Booking;

/// Notification errors
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Delivery service unreachable
    #[error("Notification delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    /// Delivery service refused the message
    #[error("Notification rejected with HTTP {0}")]
    Rejected(u16),
}

/// Result type for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Email-delivery collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a booking confirmation
    async fn booking_confirmed(&self, booking: &Booking) -> NotifyResult<()>;
}

/// Send a booking confirmation, logging and swallowing any failure
pub async fn notify_quietly(notifier: &dyn Notifier, booking: &Booking) {
    if let Err(e) = notifier.booking_confirmed(booking).await {
        log::warn!(
            "Booking {} confirmed but notification failed: {}",
            booking.reference,
            e
        );
    }
}

/// Notifier that only logs; used when no delivery service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> NotifyResult<()> {
        log::info!(
            "Booking {} confirmed for property {} ({} to {})",
            booking.reference,
            booking.property_id,
            booking.check_in,
            booking.check_out
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    template: &'static str,
    to: Option<&'a str>,
    data: &'a Booking,
}

/// Posts notifications to an email-delivery webhook
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a webhook notifier
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest` error if the HTTP client cannot be built
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            url: url.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> NotifyResult<()> {
        let message = WebhookMessage {
            template: "booking_confirmation",
            to: booking.guest_email.as_deref(),
            data: booking,
        };

        let response = self.client.post(&self.url).json(&message).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::models::{BookingStatus, PaymentMethod};
    use chrono::{NaiveDate, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct FailingNotifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn booking_confirmed(&self, _booking: &Booking) -> NotifyResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::Rejected(500))
        }
    }

    fn booking() -> Booking {
        Booking {
            id: Uuid::new_v4(),
            reference: "HK-ABCDEF12".to_string(),
            property_id: 1,
            wallet_address: None,
            guest_email: Some("guest@example.com".to_string()),
            check_in: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            guests: 2,
            nights: 7,
            total_usd: 3240.0,
            total_hkt: None,
            hkt_rate: None,
            payment_method: PaymentMethod::Card,
            payment_reference: "ch_1".to_string(),
            is_owner_booking: false,
            idempotency_key: "k".to_string(),
            request_fingerprint: String::new(),
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_notify_quietly_swallows_failure() {
        let notifier = FailingNotifier {
            calls: AtomicUsize::new(0),
        };
        notify_quietly(&notifier, &booking()).await;
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        assert!(LogNotifier.booking_confirmed(&booking()).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_an_error() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/send", Duration::from_secs(2)).unwrap();
        assert!(notifier.booking_confirmed(&booking()).await.is_err());
    }
}
