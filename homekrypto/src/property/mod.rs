//! Property listing model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Property ID type
pub type PropertyId = i64;

/// Flat cleaning fee charged on every stay, in USD
pub const DEFAULT_CLEANING_FEE_USD: f64 = 90.0;

/// Bookable property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub location: String,
    /// Nightly rate in USD
    pub nightly_rate: f64,
    pub max_guests: u32,
    /// Flat cleaning fee in USD
    pub cleaning_fee: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Create an active property with the default cleaning fee
    pub fn new(
        id: PropertyId,
        title: impl Into<String>,
        location: impl Into<String>,
        nightly_rate: f64,
        max_guests: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            location: location.into(),
            nightly_rate,
            max_guests,
            cleaning_fee: DEFAULT_CLEANING_FEE_USD,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
