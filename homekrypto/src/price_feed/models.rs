//! Price feed data models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Latest HKT market record (`GET /api/hkt-stats`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HktPriceSnapshot {
    /// USD per HKT
    pub price: f64,
    /// 24h change in percent
    pub price_change_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub total_supply: Option<f64>,
    pub last_updated: DateTime<Utc>,
    /// Provider that produced this record
    pub source: String,
}

impl HktPriceSnapshot {
    /// Rate value object handed to the price composer
    pub fn rate(&self) -> HktRate {
        HktRate {
            usd_per_hkt: self.price,
            fetched_at: self.last_updated,
            source: self.source.clone(),
        }
    }
}

/// Timestamped HKT rate used to convert a USD total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HktRate {
    pub usd_per_hkt: f64,
    pub fetched_at: DateTime<Utc>,
    pub source: String,
}

impl HktRate {
    pub fn new(usd_per_hkt: f64, fetched_at: DateTime<Utc>, source: impl Into<String>) -> Self {
        Self {
            usd_per_hkt,
            fetched_at,
            source: source.into(),
        }
    }

    /// Positive and finite
    pub fn is_usable(&self) -> bool {
        self.usd_per_hkt.is_finite() && self.usd_per_hkt > 0.0
    }

    /// Time since the rate was fetched
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    /// Whether the rate is older than `max_age`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}
