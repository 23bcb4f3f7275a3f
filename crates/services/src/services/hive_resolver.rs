//! Find-or-create of a hive by name inside a caller-owned transaction.
//!
//! The resolver never commits. Whatever it creates lives and dies with the
//! caller's transaction, so a hive only becomes visible together with the entry
//! that needed it.

use db::{StoreError, is_unique_violation, models::hive::Hive};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

/// Return the hive called `hive_name`, creating it if it does not exist.
///
/// Serialization: the hive lock is taken before the lookup, so two transactions
/// resolving the same name never both observe "absent". The second waits for
/// the first to finish (bounded by the store's busy timeout) and then finds the
/// committed row.
///
/// Errors:
/// - [`StoreError::Conflict`] if the insert still hits the unique index on
///   `hive_name`. The caller's transaction must be abandoned.
/// - [`StoreError::Storage`] for lock-wait timeouts and any other engine failure.
pub async fn resolve_or_create(
    tx: &mut Transaction<'_, Sqlite>,
    hive_name: i64,
) -> Result<Hive, StoreError> {
    Hive::lock_for_update(&mut **tx, hive_name).await?;

    if let Some(hive) = Hive::find_by_name(&mut **tx, hive_name).await? {
        debug!(hive_name, hive_id = hive.id, "Resolved existing hive");
        return Ok(hive);
    }

    match Hive::create(&mut **tx, hive_name).await {
        Ok(hive) => {
            debug!(hive_name, hive_id = hive.id, "Created hive");
            Ok(hive)
        }
        Err(e) if is_unique_violation(&e) => {
            debug!(hive_name, "Hive insert lost a race on hive_name");
            Err(StoreError::Conflict { hive_name })
        }
        Err(e) => Err(StoreError::Storage(e)),
    }
}

#[cfg(test)]
mod tests {
    use db::test_utils::create_test_pool;

    use super::*;

    #[tokio::test]
    async fn test_creates_missing_hive() {
        let (pool, _temp_dir) = create_test_pool().await;

        let mut tx = pool.begin().await.unwrap();
        let hive = resolve_or_create(&mut tx, 42).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(hive.hive_name, 42);
        let stored = Hive::find_by_name(&pool, 42).await.unwrap().unwrap();
        assert_eq!(stored, hive);
    }

    #[tokio::test]
    async fn test_returns_existing_hive_unchanged() {
        let (pool, _temp_dir) = create_test_pool().await;
        let existing = Hive::create(&pool, 42).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let resolved = resolve_or_create(&mut tx, 42).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(resolved, existing);
        assert_eq!(Hive::count_by_name(&pool, 42).await.unwrap(), 1);
        let stored = Hive::find_by_name(&pool, 42).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, existing.updated_at);
    }

    #[tokio::test]
    async fn test_resolving_twice_in_one_transaction_is_stable() {
        let (pool, _temp_dir) = create_test_pool().await;

        let mut tx = pool.begin().await.unwrap();
        let first = resolve_or_create(&mut tx, 3).await.unwrap();
        let second = resolve_or_create(&mut tx, 3).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(Hive::count_by_name(&pool, 3).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_created_hive_disappears_on_rollback() {
        let (pool, _temp_dir) = create_test_pool().await;

        let mut tx = pool.begin().await.unwrap();
        resolve_or_create(&mut tx, 7).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(Hive::find_by_name(&pool, 7).await.unwrap().is_none());
    }
}
