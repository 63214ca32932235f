//! Booking data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ownership::WalletAddress;
use crate::property::PropertyId;

/// Unrecognized enum value read from storage or a request
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Quote and payment currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD", alias = "usd")]
    Usd,
    #[serde(rename = "HKT", alias = "hkt")]
    Hkt,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Hkt => write!(f, "HKT"),
        }
    }
}

impl FromStr for Currency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "HKT" => Ok(Currency::Hkt),
            _ => Err(UnknownVariant {
                kind: "currency",
                value: s.to_string(),
            }),
        }
    }
}

/// How a booking is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card charge through the card processor, settled in USD
    Card,
    /// On-chain HKT transfer, settled in HKT
    HktTransfer,
}

impl PaymentMethod {
    /// Currency the payment settles in
    pub fn currency(&self) -> Currency {
        match self {
            PaymentMethod::Card => Currency::Usd,
            PaymentMethod::HktTransfer => Currency::Hkt,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::HktTransfer => write!(f, "hkt_transfer"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "hkt_transfer" => Ok(PaymentMethod::HktTransfer),
            _ => Err(UnknownVariant {
                kind: "payment method",
                value: s.to_string(),
            }),
        }
    }
}

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Dates reserved, payment not yet captured
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Whether a booking in this status holds its dates
    pub fn holds_dates(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(UnknownVariant {
                kind: "booking status",
                value: s.to_string(),
            }),
        }
    }
}

/// Price calculation request (`POST /api/bookings/calculate-price`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatePriceRequest {
    pub property_id: PropertyId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    #[serde(default)]
    pub currency: Currency,
}

/// Booking submission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub property_id: PropertyId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    /// Card token for card payments, transaction hash for HKT transfers
    pub payment_source: String,
    #[serde(default)]
    pub guest_email: Option<String>,
    /// USD total the client was shown; rejected if the server disagrees
    #[serde(default)]
    pub quoted_total_usd: Option<f64>,
    /// Reused across client retries so a replay returns the first booking
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl CreateBookingRequest {
    /// Quote inputs for this submission
    pub fn price_request(&self, currency: Currency) -> CalculatePriceRequest {
        CalculatePriceRequest {
            property_id: self.property_id,
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
            currency,
        }
    }
}

/// Derived price quote; never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub property_id: PropertyId,
    pub nights: u32,
    pub guests: u32,
    pub nightly_rate: f64,
    pub base_price: f64,
    pub cleaning_fee: f64,
    pub total_usd: f64,
    /// Present when a usable HKT rate was available
    pub total_hkt: Option<f64>,
    pub currency: Currency,
    pub is_owner_booking: bool,
    pub hkt_rate: Option<f64>,
    pub rate_fetched_at: Option<DateTime<Utc>>,
}

/// Persisted booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub property_id: PropertyId,
    pub wallet_address: Option<WalletAddress>,
    pub guest_email: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub nights: u32,
    pub total_usd: f64,
    pub total_hkt: Option<f64>,
    pub hkt_rate: Option<f64>,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub is_owner_booking: bool,
    pub idempotency_key: String,
    /// Hash of the submission that created this booking; never sent to clients
    #[serde(skip_serializing, default)]
    pub request_fingerprint: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Whether this booking occupies any night in `[check_in, check_out)`
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.status.holds_dates()
            && self.check_in < check_out
            && self.check_out > check_in
    }
}

/// Result of a booking submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking: Booking,
    /// True when the idempotency key matched an earlier booking
    pub replayed: bool,
}

/// Generate a human-readable booking reference (`HK-` + 8 hex chars)
pub fn generate_reference(id: &Uuid) -> String {
    let simple = id.simple().to_string();
    format!("HK-{}", simple[..8].to_ascii_uppercase())
}
