//! Storage errors and the query deadline.
//!
//! Every repository and registry query is wrapped in [`bounded`], so a
//! stalled connection fails the request with [`StorageError::Timeout`]
//! instead of holding a booking open.

use std::future::Future;
use std::time::Duration;

/// Deadline applied to a single storage query
pub const QUERY_DEADLINE: Duration = Duration::from_secs(5);

/// PostgreSQL `exclusion_violation`
const EXCLUSION_VIOLATION: &str = "23P01";

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage query exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Whether an exclusion constraint rejected the write
    pub fn is_exclusion_violation(&self) -> bool {
        match self {
            StorageError::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some(EXCLUSION_VIOLATION)
            }
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Run `query` under [`QUERY_DEADLINE`]
pub async fn bounded<F, T>(query: F) -> StorageResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    bounded_by(QUERY_DEADLINE, query).await
}

/// Run `query` under a custom deadline
pub async fn bounded_by<F, T>(deadline: Duration, query: F) -> StorageResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::time::timeout(deadline, query)
        .await
        .map_err(|_| StorageError::Timeout(deadline))?
        .map_err(StorageError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_query_passes_through() {
        let rows = bounded(async { Ok::<_, sqlx::Error>(3u64) }).await.unwrap();
        assert_eq!(rows, 3);
    }

    #[tokio::test]
    async fn test_slow_query_hits_deadline() {
        let result = bounded_by(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, StorageError::Timeout(d) if d == Duration::from_millis(10)));
        assert!(err.to_string().contains("deadline"));
    }

    #[tokio::test]
    async fn test_driver_error_is_kept() {
        let err = bounded(async { Err::<(), _>(sqlx::Error::RowNotFound) })
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Database(sqlx::Error::RowNotFound)));
        assert!(!err.is_exclusion_violation());
        assert!(!StorageError::Timeout(QUERY_DEADLINE).is_exclusion_violation());
    }
}
