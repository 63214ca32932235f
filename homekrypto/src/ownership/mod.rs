//! Property share ownership and free-week entitlement.
//!
//! Ownership lives in an external registry (the on-chain share contract in
//! production). The booking calculator only needs one question answered,
//! "does this wallet hold an unused free week for this property?", so the
//! registry is reached through the [`OwnershipOracle`] capability and can be
//! swapped without touching pricing.
//!
//! Lookup failures are a discount problem, not a booking problem: callers in
//! [`crate::booking`] treat them as "no ownership".

pub mod errors;
pub mod models;
pub mod oracle;

pub use errors::{OwnershipError, OwnershipResult};
pub use models::{OwnershipStatus, WalletAddress};
pub use oracle::{InMemoryOwnershipOracle, LedgerOwnershipOracle, OwnershipOracle};
