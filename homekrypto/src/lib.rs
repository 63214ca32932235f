//! # HomeKrypto
//!
//! Booking price and eligibility core for the HomeKrypto fractional
//! real-estate platform.
//!
//! A stay is quoted by combining a property's nightly rate, a flat cleaning
//! fee and the caller's free-week entitlement, then converted into HKT using
//! the latest polled token price. Submission charges an external payment
//! gateway and persists the booking under an idempotency key, so a retried
//! submission never creates a second booking.
//!
//! ## Core Modules
//!
//! - [`booking`]: night calculator, price composer, HKT converter and the
//!   [`BookingManager`] that quotes and submits bookings
//! - [`ownership`]: wallet addresses and the [`OwnershipOracle`] capability
//! - [`price_feed`]: HKT price providers and the latest-price record
//! - [`payment`]: payment gateway collaborator
//! - [`notify`]: transactional notifications (never block a booking)
//! - [`db`]: PostgreSQL pool, repositories and in-memory stand-ins
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use homekrypto::booking::{StayPolicy, count_nights};
//!
//! let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let check_in = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
//! let check_out = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap();
//!
//! let nights = count_nights(check_in, check_out, today, &StayPolicy::default()).unwrap();
//! assert_eq!(nights, 7);
//! ```

/// Booking quotes and submission.
pub mod booking;
/// Storage: connection pool, repositories and in-memory implementations.
pub mod db;
/// Transactional notifications.
pub mod notify;
/// Property share ownership and free-week entitlement.
pub mod ownership;
/// Payment gateway collaborator.
pub mod payment;
/// HKT token price feed.
pub mod price_feed;
/// Property listings.
pub mod property;

pub use booking::{BookingError, BookingManager, BookingResult, PriceQuote};
pub use ownership::{OwnershipOracle, OwnershipStatus, WalletAddress};
pub use price_feed::{HktPriceSnapshot, HktRate, PriceFeed};
pub use property::Property;
