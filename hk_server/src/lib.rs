//! HomeKrypto booking HTTP service.
//!
//! Wires the `homekrypto` booking core to PostgreSQL, the HKT price
//! providers, the payment gateway and the email webhook, and serves the
//! booking API over axum.

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod poller;
