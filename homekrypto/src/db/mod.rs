//! Storage layer: PostgreSQL pool, repositories and in-memory stand-ins.
//!
//! The booking core only sees repository trait objects, so it runs the same
//! against PostgreSQL and against the [`memory`] implementations used in
//! tests.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};

pub mod config;
pub mod errors;
pub mod memory;
pub mod repository;

pub use config::DatabaseConfig;
pub use errors::{StorageError, StorageResult, bounded};
pub use repository::{
    BookingRepository, InsertOutcome, PgBookingRepository, PgPriceRepository,
    PgPropertyRepository, PriceRepository, PropertyRepository,
};

/// Shared PostgreSQL pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool described by `config`.
    ///
    /// ```no_run
    /// use homekrypto::db::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), sqlx::Error> {
    /// let config = DatabaseConfig::for_url("postgres://localhost/homekrypto");
    /// let db = Database::new(&config).await?;
    /// println!("database answered in {:?}", db.health_check().await);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Database pool ready ({}..{} connections)",
            config.min_connections,
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query, returning how long it took
    pub async fn health_check(&self) -> StorageResult<Duration> {
        let started = Instant::now();
        bounded(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(started.elapsed())
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(self) {
        self.pool.close().await;
    }
}
