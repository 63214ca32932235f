//! Repository trait definitions and their PostgreSQL implementations.
//!
//! The booking core only depends on these traits, which keeps it testable
//! against the in-memory implementations in [`super::memory`].
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{StorageResult, bounded};
use crate::booking::models::{Booking, BookingStatus, PaymentMethod};
use crate::ownership::WalletAddress;
use crate::price_feed::HktPriceSnapshot;
use crate::property::{Property, PropertyId};

/// Outcome of reserving a booking under an idempotency key
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// New row written
    Inserted(Booking),
    /// A booking with the same idempotency key already existed
    Duplicate(Booking),
    /// Another pending or confirmed booking holds some of the nights
    Overlap,
}

/// Trait for property repository operations
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Find property by ID (active or not)
    async fn get_property(&self, id: PropertyId) -> StorageResult<Option<Property>>;

    /// List active properties ordered by ID
    async fn list_active(&self) -> StorageResult<Vec<Property>>;
}

/// Trait for booking repository operations
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Find booking by idempotency key
    async fn find_by_idempotency_key(&self, key: &str) -> StorageResult<Option<Booking>>;

    /// Insert booking unless its idempotency key is taken or its nights are held
    ///
    /// The key check and the overlap check are atomic with the write, so of
    /// two concurrent reservations for the same nights exactly one succeeds.
    async fn insert(&self, booking: &Booking) -> StorageResult<InsertOutcome>;

    /// Move a pending booking to confirmed once its payment is captured
    ///
    /// Returns `None` when no pending booking has this id.
    async fn confirm(&self, id: Uuid, payment_reference: &str) -> StorageResult<Option<Booking>>;

    /// Drop a pending booking whose payment failed, freeing its nights and key
    async fn release(&self, id: Uuid) -> StorageResult<()>;

    /// Bookings made by a wallet, newest first
    async fn list_by_wallet(&self, wallet: &WalletAddress) -> StorageResult<Vec<Booking>>;
}

/// Trait for the single latest-price record
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Overwrite the latest price record
    async fn save_latest(&self, snapshot: &HktPriceSnapshot) -> StorageResult<()>;

    /// Load the latest price record, if one was ever stored
    async fn load_latest(&self) -> StorageResult<Option<HktPriceSnapshot>>;
}

fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn property_from_row(row: &PgRow) -> Property {
    Property {
        id: row.get("id"),
        title: row.get("title"),
        location: row.get("location"),
        nightly_rate: row.get("nightly_rate"),
        max_guests: row.get::<i32, _>("max_guests").max(0) as u32,
        cleaning_fee: row.get("cleaning_fee"),
        is_active: row.get("is_active"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    }
}

fn booking_from_row(row: &PgRow) -> Result<Booking, sqlx::Error> {
    let wallet_address = row
        .get::<Option<String>, _>("wallet_address")
        .map(|raw| WalletAddress::parse(&raw))
        .transpose()
        .map_err(decode_error)?;
    let payment_method: PaymentMethod = row
        .get::<String, _>("payment_method")
        .parse()
        .map_err(decode_error)?;
    let status: BookingStatus = row.get::<String, _>("status").parse().map_err(decode_error)?;

    Ok(Booking {
        id: row.get("id"),
        reference: row.get("reference"),
        property_id: row.get("property_id"),
        wallet_address,
        guest_email: row.get("guest_email"),
        check_in: row.get("check_in"),
        check_out: row.get("check_out"),
        guests: row.get::<i32, _>("guests").max(0) as u32,
        nights: row.get::<i32, _>("nights").max(0) as u32,
        total_usd: row.get("total_usd"),
        total_hkt: row.get("total_hkt"),
        hkt_rate: row.get("hkt_rate"),
        payment_method,
        payment_reference: row.get("payment_reference"),
        is_owner_booking: row.get("is_owner_booking"),
        idempotency_key: row.get("idempotency_key"),
        request_fingerprint: row.get("request_fingerprint"),
        status,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

const BOOKING_COLUMNS: &str = "id, reference, property_id, wallet_address, guest_email, check_in, \
     check_out, guests, nights, total_usd, total_hkt, hkt_rate, payment_method, \
     payment_reference, is_owner_booking, idempotency_key, request_fingerprint, status, created_at";

/// PostgreSQL implementation of `PropertyRepository`
pub struct PgPropertyRepository {
    pool: Arc<PgPool>,
}

impl PgPropertyRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    async fn get_property(&self, id: PropertyId) -> StorageResult<Option<Property>> {
        let row = bounded(
            sqlx::query(
                r#"
                SELECT id, title, location, nightly_rate, max_guests, cleaning_fee,
                       is_active, created_at, updated_at
                FROM properties
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.as_ref().map(property_from_row))
    }

    async fn list_active(&self) -> StorageResult<Vec<Property>> {
        let rows = bounded(
            sqlx::query(
                r#"
                SELECT id, title, location, nightly_rate, max_guests, cleaning_fee,
                       is_active, created_at, updated_at
                FROM properties
                WHERE is_active = TRUE
                ORDER BY id
                "#,
            )
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        Ok(rows.iter().map(property_from_row).collect())
    }
}

/// PostgreSQL implementation of `BookingRepository`
pub struct PgBookingRepository {
    pool: Arc<PgPool>,
}

impl PgBookingRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find_by_idempotency_key(&self, key: &str) -> StorageResult<Option<Booking>> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE idempotency_key = $1");
        let row = bounded(
            sqlx::query(&query)
                .bind(key)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.as_ref().map(booking_from_row).transpose()?)
    }

    async fn insert(&self, booking: &Booking) -> StorageResult<InsertOutcome> {
        // Unique idempotency_key and the bookings_no_overlap exclusion
        // constraint settle concurrent submissions
        let inserted = bounded(
            sqlx::query(
                r#"
                INSERT INTO bookings (
                    id, reference, property_id, wallet_address, guest_email, check_in,
                    check_out, guests, nights, total_usd, total_hkt, hkt_rate,
                    payment_method, payment_reference, is_owner_booking, idempotency_key,
                    request_fingerprint, status, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                ON CONFLICT (idempotency_key) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(booking.id)
            .bind(&booking.reference)
            .bind(booking.property_id)
            .bind(booking.wallet_address.as_ref().map(WalletAddress::as_str))
            .bind(&booking.guest_email)
            .bind(booking.check_in)
            .bind(booking.check_out)
            .bind(booking.guests as i32)
            .bind(booking.nights as i32)
            .bind(booking.total_usd)
            .bind(booking.total_hkt)
            .bind(booking.hkt_rate)
            .bind(booking.payment_method.to_string())
            .bind(&booking.payment_reference)
            .bind(booking.is_owner_booking)
            .bind(&booking.idempotency_key)
            .bind(&booking.request_fingerprint)
            .bind(booking.status.to_string())
            .bind(booking.created_at.naive_utc())
            .fetch_optional(self.pool.as_ref()),
        )
        .await;

        let inserted = match inserted {
            Ok(row) => row,
            Err(e) if e.is_exclusion_violation() => None,
            Err(e) => return Err(e),
        };

        if inserted.is_some() {
            return Ok(InsertOutcome::Inserted(booking.clone()));
        }

        // Either the key was taken or the nights were; a same-key retry wins
        match self.find_by_idempotency_key(&booking.idempotency_key).await? {
            Some(existing) => Ok(InsertOutcome::Duplicate(existing)),
            None => Ok(InsertOutcome::Overlap),
        }
    }

    async fn confirm(&self, id: Uuid, payment_reference: &str) -> StorageResult<Option<Booking>> {
        let query = format!(
            "UPDATE bookings SET status = 'confirmed', payment_reference = $2 \
             WHERE id = $1 AND status = 'pending' RETURNING {BOOKING_COLUMNS}"
        );
        let row = bounded(
            sqlx::query(&query)
                .bind(id)
                .bind(payment_reference)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.as_ref().map(booking_from_row).transpose()?)
    }

    async fn release(&self, id: Uuid) -> StorageResult<()> {
        bounded(
            sqlx::query("DELETE FROM bookings WHERE id = $1 AND status = 'pending'")
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(())
    }

    async fn list_by_wallet(&self, wallet: &WalletAddress) -> StorageResult<Vec<Booking>> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE wallet_address = $1 ORDER BY created_at DESC"
        );
        let rows = bounded(
            sqlx::query(&query)
                .bind(wallet.as_str())
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        Ok(rows
            .iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// PostgreSQL implementation of `PriceRepository`
pub struct PgPriceRepository {
    pool: Arc<PgPool>,
}

impl PgPriceRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceRepository for PgPriceRepository {
    async fn save_latest(&self, snapshot: &HktPriceSnapshot) -> StorageResult<()> {
        bounded(
            sqlx::query(
                r#"
                INSERT INTO hkt_price (id, price, price_change_24h, market_cap, volume_24h,
                                       total_supply, source, last_updated)
                VALUES (1, $1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO UPDATE SET
                    price = EXCLUDED.price,
                    price_change_24h = EXCLUDED.price_change_24h,
                    market_cap = EXCLUDED.market_cap,
                    volume_24h = EXCLUDED.volume_24h,
                    total_supply = EXCLUDED.total_supply,
                    source = EXCLUDED.source,
                    last_updated = EXCLUDED.last_updated
                "#,
            )
            .bind(snapshot.price)
            .bind(snapshot.price_change_24h)
            .bind(snapshot.market_cap)
            .bind(snapshot.volume_24h)
            .bind(snapshot.total_supply)
            .bind(&snapshot.source)
            .bind(snapshot.last_updated.naive_utc())
            .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(())
    }

    async fn load_latest(&self) -> StorageResult<Option<HktPriceSnapshot>> {
        let row = bounded(
            sqlx::query(
                r#"
                SELECT price, price_change_24h, market_cap, volume_24h, total_supply,
                       source, last_updated
                FROM hkt_price
                WHERE id = 1
                "#,
            )
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.map(|r| HktPriceSnapshot {
            price: r.get("price"),
            price_change_24h: r.get("price_change_24h"),
            market_cap: r.get("market_cap"),
            volume_24h: r.get("volume_24h"),
            total_supply: r.get("total_supply"),
            source: r.get("source"),
            last_updated: r.get::<chrono::NaiveDateTime, _>("last_updated").and_utc(),
        }))
    }
}
