//! In-memory repository implementations.
//!
//! Used by tests and by any wiring that runs without PostgreSQL. They follow
//! the same contracts as the `Pg*` repositories: booking insert enforces
//! idempotency-key uniqueness and rejects overlapping stays under one write
//! lock, as the unique index and exclusion constraint do in PostgreSQL.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::errors::StorageResult;
use super::repository::{BookingRepository, InsertOutcome, PriceRepository, PropertyRepository};
use crate::booking::models::{Booking, BookingStatus};
use crate::ownership::WalletAddress;
use crate::price_feed::HktPriceSnapshot;
use crate::property::{Property, PropertyId};

/// In-memory `PropertyRepository`
#[derive(Default)]
pub struct InMemoryPropertyRepository {
    properties: RwLock<BTreeMap<PropertyId, Property>>,
}

impl InMemoryPropertyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding `properties`
    pub fn with_properties(properties: impl IntoIterator<Item = Property>) -> Self {
        Self {
            properties: RwLock::new(properties.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    /// Insert or replace a property
    pub async fn upsert(&self, property: Property) {
        self.properties.write().await.insert(property.id, property);
    }
}

#[async_trait]
impl PropertyRepository for InMemoryPropertyRepository {
    async fn get_property(&self, id: PropertyId) -> StorageResult<Option<Property>> {
        Ok(self.properties.read().await.get(&id).cloned())
    }

    async fn list_active(&self) -> StorageResult<Vec<Property>> {
        Ok(self
            .properties
            .read()
            .await
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }
}

/// In-memory `BookingRepository`
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<Vec<Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bookings
    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_by_idempotency_key(&self, key: &str) -> StorageResult<Option<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .iter()
            .find(|b| b.idempotency_key == key)
            .cloned())
    }

    async fn insert(&self, booking: &Booking) -> StorageResult<InsertOutcome> {
        let mut bookings = self.bookings.write().await;
        if let Some(existing) = bookings
            .iter()
            .find(|b| b.idempotency_key == booking.idempotency_key)
        {
            return Ok(InsertOutcome::Duplicate(existing.clone()));
        }

        if booking.status.holds_dates()
            && bookings.iter().any(|b| {
                b.property_id == booking.property_id
                    && b.overlaps(booking.check_in, booking.check_out)
            })
        {
            return Ok(InsertOutcome::Overlap);
        }

        bookings.push(booking.clone());
        Ok(InsertOutcome::Inserted(booking.clone()))
    }

    async fn confirm(&self, id: Uuid, payment_reference: &str) -> StorageResult<Option<Booking>> {
        let mut bookings = self.bookings.write().await;
        Ok(bookings
            .iter_mut()
            .find(|b| b.id == id && b.status == BookingStatus::Pending)
            .map(|b| {
                b.status = BookingStatus::Confirmed;
                b.payment_reference = payment_reference.to_string();
                b.clone()
            }))
    }

    async fn release(&self, id: Uuid) -> StorageResult<()> {
        self.bookings
            .write()
            .await
            .retain(|b| !(b.id == id && b.status == BookingStatus::Pending));
        Ok(())
    }

    async fn list_by_wallet(&self, wallet: &WalletAddress) -> StorageResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .bookings
            .read()
            .await
            .iter()
            .filter(|b| b.wallet_address.as_ref() == Some(wallet))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

/// In-memory `PriceRepository`
#[derive(Default)]
pub struct InMemoryPriceRepository {
    latest: RwLock<Option<HktPriceSnapshot>>,
}

impl InMemoryPriceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceRepository for InMemoryPriceRepository {
    async fn save_latest(&self, snapshot: &HktPriceSnapshot) -> StorageResult<()> {
        *self.latest.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load_latest(&self) -> StorageResult<Option<HktPriceSnapshot>> {
        Ok(self.latest.read().await.clone())
    }
}
