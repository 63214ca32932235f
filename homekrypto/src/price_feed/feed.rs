//! Latest HKT price record and provider polling.

use std::sync::Arc;
use tokio::sync::RwLock;

use super::errors::{PriceFeedError, PriceFeedResult};
use super::models::{HktPriceSnapshot, HktRate};
use super::providers::PriceProvider;
use crate::db::repository::PriceRepository;

/// Holds the most recent successfully fetched HKT price
pub struct PriceFeed {
    providers: Vec<Arc<dyn PriceProvider>>,
    repository: Option<Arc<dyn PriceRepository>>,
    latest: RwLock<Option<HktPriceSnapshot>>,
}

impl PriceFeed {
    /// Create a feed polling `providers` in priority order
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>) -> Self {
        Self {
            providers,
            repository: None,
            latest: RwLock::new(None),
        }
    }

    /// Persist every accepted record through `repository`
    pub fn with_repository(mut self, repository: Arc<dyn PriceRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Provider names in priority order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Load the last persisted record, if any, into memory
    pub async fn restore(&self) -> PriceFeedResult<Option<HktPriceSnapshot>> {
        let Some(repository) = &self.repository else {
            return Ok(None);
        };

        let stored = repository.load_latest().await?;
        if let Some(snapshot) = &stored {
            if HktRate::from(snapshot).is_usable() {
                *self.latest.write().await = Some(snapshot.clone());
            }
        }
        Ok(stored)
    }

    /// Try each provider in order and record the first valid price
    ///
    /// # Errors
    ///
    /// * `PriceFeedError::NoProviders` - Feed has no providers
    /// * `PriceFeedError::AllProvidersFailed` - Every provider failed; the previous record is kept
    pub async fn poll_once(&self) -> PriceFeedResult<HktPriceSnapshot> {
        if self.providers.is_empty() {
            return Err(PriceFeedError::NoProviders);
        }

        let mut failures = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.fetch().await {
                Ok(snapshot) => match self.record(snapshot).await {
                    Ok(accepted) => return Ok(accepted),
                    Err(e) => failures.push(format!("{}: {}", provider.name(), e)),
                },
                Err(e) => {
                    log::warn!("Price provider {} failed: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(PriceFeedError::AllProvidersFailed(failures))
    }

    /// Validate and store a snapshot as the latest record
    ///
    /// # Errors
    ///
    /// * `PriceFeedError::InvalidPrice` - Price is not positive and finite
    pub async fn record(&self, snapshot: HktPriceSnapshot) -> PriceFeedResult<HktPriceSnapshot> {
        if !snapshot.price.is_finite() || snapshot.price <= 0.0 {
            return Err(PriceFeedError::InvalidPrice {
                provider: snapshot.source,
                price: snapshot.price,
            });
        }

        *self.latest.write().await = Some(snapshot.clone());

        if let Some(repository) = &self.repository {
            if let Err(e) = repository.save_latest(&snapshot).await {
                log::warn!("Failed to persist HKT price from {}: {}", snapshot.source, e);
            }
        }

        Ok(snapshot)
    }

    /// Most recent accepted record
    pub async fn latest(&self) -> Option<HktPriceSnapshot> {
        self.latest.read().await.clone()
    }

    /// Rate derived from the most recent accepted record
    pub async fn current_rate(&self) -> Option<HktRate> {
        self.latest.read().await.as_ref().map(HktRate::from)
    }
}

impl From<&HktPriceSnapshot> for HktRate {
    fn from(snapshot: &HktPriceSnapshot) -> Self {
        snapshot.rate()
    }
}
