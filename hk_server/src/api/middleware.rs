//! Caller wallet extraction.
//!
//! The caller names its wallet with an `X-Wallet-Address` header and proves
//! it with a wallet session token in `Authorization: Bearer ...` (see
//! [`crate::auth`]). A verified wallet gets owner pricing, may spend the
//! owner's free week when booking, and can list its bookings, so a header
//! without a valid token for the same address is refused with `401`.
//!
//! # Extracting the wallet
//!
//! ```rust,no_run
//! use hk_server::api::middleware::{CallerWallet, RequiredWallet};
//!
//! async fn quote(CallerWallet(wallet): CallerWallet) -> String {
//!     format!("owner pricing for {:?}", wallet)
//! }
//!
//! async fn mine(RequiredWallet(wallet): RequiredWallet) -> String {
//!     format!("bookings of {}", wallet)
//! }
//! # let _ = (quote, mine);
//! ```

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use homekrypto::WalletAddress;
use std::sync::Arc;

use super::errors::{ApiError, error};
use crate::auth::WalletAuth;

/// Header carrying the caller's wallet address
pub const WALLET_HEADER: &str = "x-wallet-address";

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Parse and authenticate the wallet header, if present
///
/// # Errors
///
/// * `400 Bad Request` - Header present but not a valid address
/// * `401 Unauthorized` - No session token, or one not issued to this wallet
fn wallet_from_parts(parts: &Parts, auth: &WalletAuth) -> Result<Option<WalletAddress>, ApiError> {
    let Some(value) = parts.headers.get(WALLET_HEADER) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| error(StatusCode::BAD_REQUEST, "X-Wallet-Address is not valid text"))?
        .trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let wallet =
        WalletAddress::parse(raw).map_err(|e| error(StatusCode::BAD_REQUEST, e.client_message()))?;

    let token = bearer_token(parts).ok_or_else(|| {
        error(
            StatusCode::UNAUTHORIZED,
            "X-Wallet-Address requires a wallet session token",
        )
    })?;
    auth.verify(token, &wallet).map_err(|e| {
        tracing::debug!(wallet = %wallet, error = %e, "Wallet session rejected");
        error(StatusCode::UNAUTHORIZED, e.to_string())
    })?;

    Ok(Some(wallet))
}

/// Optional, authenticated caller wallet
#[derive(Debug, Clone)]
pub struct CallerWallet(pub Option<WalletAddress>);

impl<S> FromRequestParts<S> for CallerWallet
where
    S: Send + Sync,
    Arc<WalletAuth>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<WalletAuth>::from_ref(state);
        wallet_from_parts(parts, &auth).map(CallerWallet)
    }
}

/// Authenticated caller wallet that must be present
#[derive(Debug, Clone)]
pub struct RequiredWallet(pub WalletAddress);

impl<S> FromRequestParts<S> for RequiredWallet
where
    S: Send + Sync,
    Arc<WalletAuth>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<WalletAuth>::from_ref(state);
        wallet_from_parts(parts, &auth)?
            .map(RequiredWallet)
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, "X-Wallet-Address header is required"))
    }
}
