//! Ownership error types.

use thiserror::Error;

use crate::db::StorageError;
use crate::property::PropertyId;

/// Ownership errors
#[derive(Debug, Error)]
pub enum OwnershipError {
    /// Malformed wallet address
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    /// Registry storage error
    #[error("Ownership registry error: {0}")]
    Storage(#[from] StorageError),

    /// Registry could not be reached
    #[error("Ownership registry unreachable: {0}")]
    Unreachable(String),

    /// No unused free week to consume
    #[error("No unused free week for property {property_id}")]
    NoFreeWeek { property_id: PropertyId },
}

impl OwnershipError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            OwnershipError::Storage(_) | OwnershipError::Unreachable(_) => {
                "Ownership registry unavailable".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for ownership operations
pub type OwnershipResult<T> = Result<T, OwnershipError>;
