//! Tasks scheduled against a hive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

use crate::validation::{ValidationError, validate_optional_content};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub hive_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub content: Option<String>,
    #[serde(rename = "hiveID")]
    pub hive_id: Option<i64>,
}

impl UpdateTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.is_none() && self.hive_id.is_none() {
            return Err(ValidationError::EmptyUpdate);
        }
        validate_optional_content(self.content.as_deref())
    }
}

impl Task {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM tasks
            ORDER BY id ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM tasks
            WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_last(pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM tasks
            ORDER BY created_at DESC, id DESC
            LIMIT 1"#,
        )
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_hive_name<'e, E>(
        executor: E,
        hive_name: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM tasks
            WHERE hive_id = $1
            ORDER BY created_at ASC, id ASC"#,
        )
        .bind(hive_name)
        .fetch_all(executor)
        .await
    }

    pub async fn create<'e, E>(executor: E, hive_id: i64, content: &str) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(
            r#"INSERT INTO tasks (hive_id, content)
            VALUES ($1, $2)
            RETURNING id, hive_id, content, created_at, updated_at"#,
        )
        .bind(hive_id)
        .bind(content)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        data: &UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(
            r#"UPDATE tasks
            SET content = COALESCE($2, content),
                hive_id = COALESCE($3, hive_id),
                updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING id, hive_id, content, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.content.as_deref())
        .bind(data.hive_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_hive_name<'e, E>(executor: E, hive_name: i64) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE hive_id = $1")
            .bind(hive_name)
            .fetch_one(executor)
            .await
    }
}
