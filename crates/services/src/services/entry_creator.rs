//! Atomic creation of a log or task together with the hive it references.
//!
//! One call runs one transaction:
//!
//! ```text
//! Started -> HiveResolved -> EntryInserted -> Committed
//!    \            \                \
//!     +------------+----------------+-------> RolledBack
//! ```
//!
//! Either the entry and (if it was missing) its hive are both committed, or
//! neither is. A hive conflict rolls back and re-runs the whole transaction
//! once; storage failures are returned as-is.

use db::{
    DBService, StoreError,
    models::{
        entry::{Entry, EntryKind},
        log::Log,
        task::Task,
    },
    validation::require_content,
};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

use super::hive_resolver::resolve_or_create;

/// Progress of a single creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Started,
    HiveResolved,
    EntryInserted,
    Committed,
    RolledBack,
}

/// Creates logs and tasks, resolving or creating their hive in the same transaction.
#[derive(Clone)]
pub struct EntryCreator {
    db: DBService,
}

impl EntryCreator {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn create_log(&self, hive_name: i64, content: &str) -> Result<Log, StoreError> {
        self.create_entry(hive_name, content, EntryKind::Log)
            .await?
            .into_log()
            .ok_or_else(|| kind_mismatch(EntryKind::Log))
    }

    pub async fn create_task(&self, hive_name: i64, content: &str) -> Result<Task, StoreError> {
        self.create_entry(hive_name, content, EntryKind::Task)
            .await?
            .into_task()
            .ok_or_else(|| kind_mismatch(EntryKind::Task))
    }

    /// Create an entry of `kind` under the hive called `hive_name`.
    ///
    /// Blank content is rejected before a transaction is opened. If the hive
    /// insert conflicts with a concurrent creator the attempt is rolled back and
    /// retried once, at which point the resolver finds the committed hive.
    pub async fn create_entry(
        &self,
        hive_name: i64,
        content: &str,
        kind: EntryKind,
    ) -> Result<Entry, StoreError> {
        let content = require_content(Some(content.to_string()))?;

        match self.attempt(hive_name, &content, kind).await {
            Err(e) if e.is_retryable() => {
                debug!(hive_name, %kind, error = %e, "Retrying entry creation after hive conflict");
                self.attempt(hive_name, &content, kind).await
            }
            result => result,
        }
    }

    /// Open a transaction on the store's pool.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.db.pool.begin().await?)
    }

    /// Insert an entry inside `tx`. The hive must already be resolved in the same transaction.
    pub async fn insert_entry(
        tx: &mut Transaction<'_, Sqlite>,
        kind: EntryKind,
        hive_name: i64,
        content: &str,
    ) -> Result<Entry, StoreError> {
        Ok(Entry::create(&mut **tx, kind, hive_name, content).await?)
    }

    async fn attempt(
        &self,
        hive_name: i64,
        content: &str,
        kind: EntryKind,
    ) -> Result<Entry, StoreError> {
        let mut tx = self.begin().await?;
        trace_state(CreationState::Started, hive_name, kind);

        let entry = match Self::resolve_and_insert(&mut tx, hive_name, content, kind).await {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(hive_name, error = %rollback_err, "Rollback failed; connection discards the transaction");
                }
                warn!(hive_name, %kind, state = ?CreationState::RolledBack, error = %e, "Entry creation rolled back");
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            warn!(hive_name, %kind, state = ?CreationState::RolledBack, error = %e, "Commit failed");
            return Err(StoreError::Storage(e));
        }

        debug!(
            hive_name,
            %kind,
            entry_id = entry.id(),
            state = ?CreationState::Committed,
            "Entry creation committed"
        );
        Ok(entry)
    }

    async fn resolve_and_insert(
        tx: &mut Transaction<'_, Sqlite>,
        hive_name: i64,
        content: &str,
        kind: EntryKind,
    ) -> Result<Entry, StoreError> {
        let hive = resolve_or_create(tx, hive_name).await?;
        trace_state(CreationState::HiveResolved, hive.hive_name, kind);

        let entry = Self::insert_entry(tx, kind, hive.hive_name, content).await?;
        trace_state(CreationState::EntryInserted, hive_name, kind);

        Ok(entry)
    }
}

fn kind_mismatch(requested: EntryKind) -> StoreError {
    StoreError::Storage(sqlx::Error::Protocol(format!(
        "inserted row is not a {requested}"
    )))
}

fn trace_state(state: CreationState, hive_name: i64, kind: EntryKind) {
    debug!(hive_name, %kind, ?state, "Entry creation state");
}

#[cfg(test)]
mod tests {
    use db::{models::hive::Hive, test_utils::create_test_db, validation::ValidationError};

    use super::*;

    #[tokio::test]
    async fn test_creates_hive_with_first_entry() {
        let (db, _temp_dir) = create_test_db().await;
        let creator = EntryCreator::new(db.clone());

        let log = creator.create_log(42, "Queen spotted").await.unwrap();
        assert_eq!(log.hive_id, 42);
        assert_eq!(log.content, "Queen spotted");

        let hive = Hive::find_by_name(&db.pool, 42).await.unwrap().unwrap();
        assert_eq!(hive.hive_name, 42);
    }

    #[tokio::test]
    async fn test_reuses_existing_hive() {
        let (db, _temp_dir) = create_test_db().await;
        let creator = EntryCreator::new(db.clone());
        let existing = Hive::create(&db.pool, 5).await.unwrap();

        creator.create_task(5, "Add super").await.unwrap();
        creator.create_log(5, "Super added").await.unwrap();

        let hive = Hive::find_by_name(&db.pool, 5).await.unwrap().unwrap();
        assert_eq!(hive, existing);
        assert_eq!(Hive::find_all(&db.pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_content_rejected_before_storage() {
        let (db, _temp_dir) = create_test_db().await;
        let creator = EntryCreator::new(db.clone());

        let err = creator.create_log(7, "  ").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingContent)
        ));
        assert!(Hive::find_by_name(&db.pool, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_entry_returns_requested_kind() {
        let (db, _temp_dir) = create_test_db().await;
        let creator = EntryCreator::new(db);

        let entry = creator
            .create_entry(8, "Check stores", EntryKind::Task)
            .await
            .unwrap();
        assert_eq!(entry.kind(), EntryKind::Task);
        assert_eq!(entry.hive_id(), 8);
        assert_eq!(entry.content(), "Check stores");
    }

    #[tokio::test]
    async fn test_composed_steps_commit_together() {
        let (db, _temp_dir) = create_test_db().await;
        let creator = EntryCreator::new(db.clone());

        let mut tx = creator.begin().await.unwrap();
        let hive = resolve_or_create(&mut tx, 11).await.unwrap();
        let entry = EntryCreator::insert_entry(&mut tx, EntryKind::Log, hive.hive_name, "Mite board")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let logs = Log::find_by_hive_name(&db.pool, 11).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, entry.id());
    }
}
