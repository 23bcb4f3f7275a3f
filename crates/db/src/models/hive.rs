//! Hive model: the parent record, keyed by the caller-chosen `hive_name`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

use super::{log::Log, task::Task};
use crate::validation::ValidationError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Hive {
    pub id: i64,
    /// Business key; unique across all hives.
    pub hive_name: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A hive together with every log and task that references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveWithEntries {
    #[serde(flatten)]
    pub hive: Hive,
    pub logs: Vec<Log>,
    pub tasks: Vec<Task>,
}

impl std::ops::Deref for HiveWithEntries {
    type Target = Hive;
    fn deref(&self) -> &Self::Target {
        &self.hive
    }
}

/// Request to create a hive explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHive {
    #[serde(rename = "hiveName")]
    pub hive_name: Option<i64>,
}

impl CreateHive {
    pub fn validate(&self) -> Result<i64, ValidationError> {
        self.hive_name.ok_or(ValidationError::MissingHiveName)
    }
}

/// Request to rename a hive.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateHive {
    #[serde(rename = "hiveName")]
    pub hive_name: Option<i64>,
}

impl UpdateHive {
    pub fn validate(&self) -> Result<i64, ValidationError> {
        self.hive_name.ok_or(ValidationError::EmptyUpdate)
    }
}

impl Hive {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Hive>(
            r#"SELECT id, hive_name, created_at, updated_at
            FROM hives
            ORDER BY hive_name ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Hive>(
            r#"SELECT id, hive_name, created_at, updated_at
            FROM hives
            WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_name<'e, E>(
        executor: E,
        hive_name: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Hive>(
            r#"SELECT id, hive_name, created_at, updated_at
            FROM hives
            WHERE hive_name = $1"#,
        )
        .bind(hive_name)
        .fetch_optional(executor)
        .await
    }

    /// Take the write lock covering `hive_name` for the rest of the transaction.
    ///
    /// SQLite has no `SELECT ... FOR UPDATE`. A write statement, even one that
    /// matches nothing, upgrades the transaction to a writer, so every other
    /// transaction that issues this for any hive waits on `busy_timeout` until we
    /// commit or roll back. Must be the first statement of the transaction: a
    /// transaction that already read can fail with SQLITE_BUSY_SNAPSHOT instead
    /// of waiting.
    pub async fn lock_for_update<'e, E>(executor: E, hive_name: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE hives SET hive_name = hive_name WHERE hive_name = $1")
            .bind(hive_name)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn create<'e, E>(executor: E, hive_name: i64) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Hive>(
            r#"INSERT INTO hives (hive_name)
            VALUES ($1)
            RETURNING id, hive_name, created_at, updated_at"#,
        )
        .bind(hive_name)
        .fetch_one(executor)
        .await
    }

    /// Change a hive's name. Entries follow through `ON UPDATE CASCADE`.
    /// Returns `None` when no hive is called `hive_name`.
    pub async fn rename<'e, E>(
        executor: E,
        hive_name: i64,
        new_name: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Hive>(
            r#"UPDATE hives
            SET hive_name = $2, updated_at = datetime('now', 'subsec')
            WHERE hive_name = $1
            RETURNING id, hive_name, created_at, updated_at"#,
        )
        .bind(hive_name)
        .bind(new_name)
        .fetch_optional(executor)
        .await
    }

    /// Delete a hive and, through the foreign keys, all of its logs and tasks.
    pub async fn delete_by_name<'e, E>(executor: E, hive_name: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM hives WHERE hive_name = $1")
            .bind(hive_name)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_name<'e, E>(executor: E, hive_name: i64) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hives WHERE hive_name = $1")
            .bind(hive_name)
            .fetch_one(executor)
            .await
    }

    /// Load a hive with its logs and tasks from one read transaction.
    pub async fn find_with_entries(
        pool: &SqlitePool,
        hive_name: i64,
    ) -> Result<Option<HiveWithEntries>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(hive) = Self::find_by_name(&mut *tx, hive_name).await? else {
            return Ok(None);
        };
        let logs = Log::find_by_hive_name(&mut *tx, hive_name).await?;
        let tasks = Task::find_by_hive_name(&mut *tx, hive_name).await?;

        tx.commit().await?;
        Ok(Some(HiveWithEntries { hive, logs, tasks }))
    }
}
