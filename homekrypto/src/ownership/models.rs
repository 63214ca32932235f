//! Ownership data models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::OwnershipError;

/// Length of an address body in hex characters (20 bytes)
const ADDRESS_HEX_LEN: usize = 40;

/// EVM-style wallet address, normalized to lowercase `0x`-prefixed hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize a wallet address
    ///
    /// # Errors
    ///
    /// * `OwnershipError::InvalidAddress` - Missing `0x` prefix, wrong length or non-hex body
    pub fn parse(raw: &str) -> Result<Self, OwnershipError> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| OwnershipError::InvalidAddress(raw.to_string()))?;

        if body.len() != ADDRESS_HEX_LEN || hex::decode(body).is_err() {
            return Err(OwnershipError::InvalidAddress(raw.to_string()));
        }

        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = OwnershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = OwnershipError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

/// Share holdings of one wallet for one property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipStatus {
    pub has_shares: bool,
    pub total_shares: u32,
    pub has_used_free_week: bool,
}

impl OwnershipStatus {
    /// Status of a wallet holding no shares
    pub fn none() -> Self {
        Self::default()
    }

    /// Status of a wallet holding `total_shares` shares
    pub fn holding(total_shares: u32, has_used_free_week: bool) -> Self {
        Self {
            has_shares: total_shares > 0,
            total_shares,
            has_used_free_week,
        }
    }

    /// Whether an unused free week is available
    pub fn has_free_week(&self) -> bool {
        self.has_shares && !self.has_used_free_week
    }
}
