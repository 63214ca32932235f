//! Wallet session tokens.
//!
//! A wallet proves control of its address to the wallet-login service by
//! signing a nonce. That service issues an HS256 token whose `sub` is the
//! wallet address, signed with the secret this server is configured with
//! (`WALLET_JWT_SECRET`). Here tokens are only verified, so a bare
//! `X-Wallet-Address` header is never enough to unlock owner pricing or a
//! wallet's bookings.

use chrono::{Duration, Utc};
use homekrypto::WalletAddress;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default lifetime of a wallet session token
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Wallet session claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletClaims {
    /// Wallet address
    pub sub: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Wallet session failures
#[derive(Debug, Error)]
pub enum WalletAuthError {
    #[error("Invalid or expired wallet session token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Wallet session token was issued for a different wallet")]
    WalletMismatch,
}

/// Issues and verifies wallet session tokens
pub struct WalletAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl WalletAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Sign a session token for `wallet`, valid for `ttl`
    pub fn issue(
        &self,
        wallet: &WalletAddress,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = WalletClaims {
            sub: wallet.as_str().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Check that `token` is current, correctly signed and issued to `wallet`
    ///
    /// # Errors
    ///
    /// * `WalletAuthError::InvalidToken` - Bad signature, malformed or expired
    /// * `WalletAuthError::WalletMismatch` - Token belongs to another wallet
    pub fn verify(&self, token: &str, wallet: &WalletAddress) -> Result<(), WalletAuthError> {
        let data = decode::<WalletClaims>(token, &self.decoding, &self.validation)?;

        match WalletAddress::parse(&data.claims.sub) {
            Ok(subject) if &subject == wallet => Ok(()),
            _ => Err(WalletAuthError::WalletMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_wallet_secret_for_testing_only";

    fn wallet(hex_digit: char) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", hex_digit.to_string().repeat(40))).unwrap()
    }

    #[test]
    fn test_issued_token_verifies_for_its_wallet() {
        let auth = WalletAuth::new(SECRET);
        let token = auth.issue(&wallet('1'), Duration::hours(1)).unwrap();

        assert!(auth.verify(&token, &wallet('1')).is_ok());
        assert!(matches!(
            auth.verify(&token, &wallet('2')),
            Err(WalletAuthError::WalletMismatch)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let forged = WalletAuth::new("some_other_secret_of_enough_length!")
            .issue(&wallet('1'), Duration::hours(1))
            .unwrap();

        let err = WalletAuth::new(SECRET).verify(&forged, &wallet('1')).unwrap_err();
        assert!(matches!(err, WalletAuthError::InvalidToken(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = WalletAuth::new(SECRET);
        let token = auth.issue(&wallet('1'), Duration::hours(-2)).unwrap();

        assert!(matches!(
            auth.verify(&token, &wallet('1')),
            Err(WalletAuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let auth = WalletAuth::new(SECRET);
        assert!(auth.verify("not.a.token", &wallet('1')).is_err());
    }
}
