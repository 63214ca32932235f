//! Ownership oracle capability and its implementations.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::errors::{OwnershipError, OwnershipResult};
use super::models::{OwnershipStatus, WalletAddress};
use crate::db::bounded;
use crate::property::PropertyId;

/// Access to the property share registry
#[async_trait]
pub trait OwnershipOracle: Send + Sync {
    /// Share holdings of `wallet` for `property_id`; no mutation
    async fn lookup(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<OwnershipStatus>;

    /// Whether `wallet` holds an unused free week for `property_id`
    async fn has_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<bool> {
        Ok(self.lookup(wallet, property_id).await?.has_free_week())
    }

    /// Atomically take the unused free week before an owner booking is charged
    ///
    /// Of several concurrent claims for one entitlement exactly one succeeds.
    ///
    /// # Errors
    ///
    /// * `OwnershipError::NoFreeWeek` - Wallet holds no unused free week
    async fn claim_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()>;

    /// Hand back a claimed free week whose booking was not completed
    async fn release_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()>;
}

/// Ownership oracle backed by the `ownership_records` ledger mirror
pub struct LedgerOwnershipOracle {
    pool: Arc<PgPool>,
}

impl LedgerOwnershipOracle {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnershipOracle for LedgerOwnershipOracle {
    async fn lookup(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<OwnershipStatus> {
        let row = bounded(
            sqlx::query(
                "SELECT share_count, has_used_free_week
                 FROM ownership_records
                 WHERE wallet_address = $1 AND property_id = $2",
            )
            .bind(wallet.as_str())
            .bind(property_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(match row {
            Some(r) => OwnershipStatus::holding(
                r.get::<i32, _>("share_count").max(0) as u32,
                r.get("has_used_free_week"),
            ),
            None => OwnershipStatus::none(),
        })
    }

    async fn claim_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()> {
        let result = bounded(
            sqlx::query(
                "UPDATE ownership_records
                 SET has_used_free_week = TRUE, updated_at = NOW()
                 WHERE wallet_address = $1 AND property_id = $2
                   AND share_count > 0 AND has_used_free_week = FALSE",
            )
            .bind(wallet.as_str())
            .bind(property_id)
            .execute(self.pool.as_ref()),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(OwnershipError::NoFreeWeek { property_id });
        }

        Ok(())
    }

    async fn release_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()> {
        bounded(
            sqlx::query(
                "UPDATE ownership_records
                 SET has_used_free_week = FALSE, updated_at = NOW()
                 WHERE wallet_address = $1 AND property_id = $2",
            )
            .bind(wallet.as_str())
            .bind(property_id)
            .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(())
    }
}

/// In-memory ownership registry
#[derive(Default)]
pub struct InMemoryOwnershipOracle {
    records: RwLock<HashMap<(WalletAddress, PropertyId), OwnershipStatus>>,
}

impl InMemoryOwnershipOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `shares` shares of `property_id` held by `wallet`
    pub async fn grant(
        &self,
        wallet: WalletAddress,
        property_id: PropertyId,
        shares: u32,
        has_used_free_week: bool,
    ) {
        self.records.write().await.insert(
            (wallet, property_id),
            OwnershipStatus::holding(shares, has_used_free_week),
        );
    }
}

#[async_trait]
impl OwnershipOracle for InMemoryOwnershipOracle {
    async fn lookup(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<OwnershipStatus> {
        Ok(self
            .records
            .read()
            .await
            .get(&(wallet.clone(), property_id))
            .copied()
            .unwrap_or_else(OwnershipStatus::none))
    }

    async fn claim_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()> {
        let mut records = self.records.write().await;
        match records.get_mut(&(wallet.clone(), property_id)) {
            Some(status) if status.has_free_week() => {
                status.has_used_free_week = true;
                Ok(())
            }
            _ => Err(OwnershipError::NoFreeWeek { property_id }),
        }
    }

    async fn release_free_week(
        &self,
        wallet: &WalletAddress,
        property_id: PropertyId,
    ) -> OwnershipResult<()> {
        if let Some(status) = self
            .records
            .write()
            .await
            .get_mut(&(wallet.clone(), property_id))
        {
            status.has_used_free_week = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    #[tokio::test]
    async fn test_unknown_wallet_has_no_ownership() {
        let oracle = InMemoryOwnershipOracle::new();
        let status = oracle.lookup(&wallet(), 1).await.unwrap();
        assert_eq!(status, OwnershipStatus::none());
        assert!(!oracle.has_free_week(&wallet(), 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_lookup_is_idempotent() {
        let oracle = InMemoryOwnershipOracle::new();
        oracle.grant(wallet(), 1, 2, false).await;

        let first = oracle.lookup(&wallet(), 1).await.unwrap();
        let second = oracle.lookup(&wallet(), 1).await.unwrap();
        assert_eq!(first, second);
        assert!(first.has_free_week());
    }

    #[tokio::test]
    async fn test_free_week_consumed_once() {
        let oracle = InMemoryOwnershipOracle::new();
        oracle.grant(wallet(), 1, 1, false).await;

        oracle.claim_free_week(&wallet(), 1).await.unwrap();
        assert!(!oracle.has_free_week(&wallet(), 1).await.unwrap());

        let err = oracle.claim_free_week(&wallet(), 1).await.unwrap_err();
        assert!(matches!(err, OwnershipError::NoFreeWeek { property_id: 1 }));
    }

    #[tokio::test]
    async fn test_released_free_week_can_be_claimed_again() {
        let oracle = InMemoryOwnershipOracle::new();
        oracle.grant(wallet(), 1, 1, false).await;

        oracle.claim_free_week(&wallet(), 1).await.unwrap();
        oracle.release_free_week(&wallet(), 1).await.unwrap();
        assert!(oracle.has_free_week(&wallet(), 1).await.unwrap());
        oracle.claim_free_week(&wallet(), 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_claims_admit_one() {
        let oracle = Arc::new(InMemoryOwnershipOracle::new());
        oracle.grant(wallet(), 1, 3, false).await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let oracle = oracle.clone();
                tokio::spawn(async move { oracle.claim_free_week(&wallet(), 1).await.is_ok() })
            })
            .collect();

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }

    #[tokio::test]
    async fn test_ownership_is_per_property() {
        let oracle = InMemoryOwnershipOracle::new();
        oracle.grant(wallet(), 1, 1, false).await;
        assert!(!oracle.has_free_week(&wallet(), 2).await.unwrap());
    }
}
