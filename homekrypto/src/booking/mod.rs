//! Booking quotes and submission.
//!
//! This module implements:
//! - Night counting against the minimum and maximum stay
//! - Price composition with the owner free-week discount
//! - USD to HKT conversion from the latest fetched rate
//! - Paid booking submission keyed by an idempotency key
//!
//! ## Example
//!
//! ```no_run
//! use homekrypto::booking::{BookingManager, BookingPolicy};
//! use homekrypto::booking::manager::BookingBackends;
//! use homekrypto::booking::models::{CalculatePriceRequest, Currency};
//! use homekrypto::db::memory::{InMemoryBookingRepository, InMemoryPropertyRepository};
//! use homekrypto::notify::LogNotifier;
//! use homekrypto::ownership::InMemoryOwnershipOracle;
//! use homekrypto::payment::DisabledPaymentGateway;
//! use homekrypto::{PriceFeed, Property};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backends = BookingBackends {
//!         properties: Arc::new(InMemoryPropertyRepository::with_properties([Property::new(
//!             1, "Seaside Villa", "Lisbon", 450.0, 8,
//!         )])),
//!         bookings: Arc::new(InMemoryBookingRepository::new()),
//!         ownership: Arc::new(InMemoryOwnershipOracle::new()),
//!         payments: Arc::new(DisabledPaymentGateway),
//!         notifier: Arc::new(LogNotifier),
//!         price_feed: Arc::new(PriceFeed::new(Vec::new())),
//!     };
//!     let manager = BookingManager::new(backends, BookingPolicy::default());
//!
//!     let quote = manager
//!         .quote(
//!             &CalculatePriceRequest {
//!                 property_id: 1,
//!                 check_in: "2030-06-01".parse()?,
//!                 check_out: "2030-06-08".parse()?,
//!                 guests: 4,
//!                 currency: Currency::Usd,
//!             },
//!             None,
//!         )
//!         .await?;
//!     println!("7 nights: {:.2} USD", quote.total_usd);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod nights;
pub mod pricing;

pub use errors::{BookingError, BookingResult};
pub use manager::{BookingBackends, BookingManager, BookingPolicy};
pub use models::{
    Booking, BookingConfirmation, CalculatePriceRequest, CreateBookingRequest, Currency,
    PaymentMethod, PriceQuote,
};
pub use nights::{StayPolicy, count_nights};
pub use pricing::{compose_price, convert_to_hkt};
