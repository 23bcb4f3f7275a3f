//! Inspection log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

use crate::validation::{ValidationError, validate_optional_content};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Log {
    pub id: i64,
    /// `hive_name` of the owning hive.
    pub hive_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a log; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLog {
    pub content: Option<String>,
    #[serde(rename = "hiveID")]
    pub hive_id: Option<i64>,
}

impl UpdateLog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.is_none() && self.hive_id.is_none() {
            return Err(ValidationError::EmptyUpdate);
        }
        validate_optional_content(self.content.as_deref())
    }
}

impl Log {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Log>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM logs
            ORDER BY id ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Log>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM logs
            WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Most recently created log. Ties on the timestamp go to the higher id.
    pub async fn find_last(pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Log>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM logs
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
        sqlx::query_as::<_, Log>(
            r#"SELECT id, hive_id, content, created_at, updated_at
            FROM logs
            WHERE hive_id = $1
            ORDER BY created_at ASC, id ASC"#,
        )
        .bind(hive_name)
        .fetch_all(executor)
        .await
    }

    /// Insert a log. The hive must already exist; callers go through the entry creator.
    pub async fn create<'e, E>(executor: E, hive_id: i64, content: &str) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Log>(
            r#"INSERT INTO logs (hive_id, content)
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
        data: &UpdateLog,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Log>(
            r#"UPDATE logs
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
        let result = sqlx::query("DELETE FROM logs WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_hive_name<'e, E>(executor: E, hive_name: i64) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM logs WHERE hive_id = $1")
            .bind(hive_name)
            .fetch_one(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::hive::Hive, test_utils::create_test_pool};

    #[tokio::test]
    async fn test_create_requires_existing_hive() {
        let (pool, _temp_dir) = create_test_pool().await;

        let err = Log::create(&pool, 404, "orphan").await.unwrap_err();
        assert!(crate::error::is_foreign_key_violation(&err));

        Hive::create(&pool, 404).await.unwrap();
        let log = Log::create(&pool, 404, "no longer an orphan").await.unwrap();
        assert_eq!(log.hive_id, 404);
        assert_eq!(log.content, "no longer an orphan");
    }

    #[tokio::test]
    async fn test_find_last_returns_newest() {
        let (pool, _temp_dir) = create_test_pool().await;
        assert!(Log::find_last(&pool).await.unwrap().is_none());

        Hive::create(&pool, 1).await.unwrap();
        Log::create(&pool, 1, "first").await.unwrap();
        let second = Log::create(&pool, 1, "second").await.unwrap();

        let last = Log::find_last(&pool).await.unwrap().unwrap();
        assert_eq!(last.id, second.id);
    }

    #[tokio::test]
    async fn test_update_keeps_absent_fields() {
        let (pool, _temp_dir) = create_test_pool().await;
        Hive::create(&pool, 1).await.unwrap();
        Hive::create(&pool, 2).await.unwrap();
        let log = Log::create(&pool, 1, "brood looks healthy").await.unwrap();

        let moved = Log::update(
            &pool,
            log.id,
            &UpdateLog {
                content: None,
                hive_id: Some(2),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(moved.hive_id, 2);
        assert_eq!(moved.content, "brood looks healthy");

        let missing = Log::update(&pool, log.id + 100, &UpdateLog::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (pool, _temp_dir) = create_test_pool().await;
        Hive::create(&pool, 1).await.unwrap();
        let log = Log::create(&pool, 1, "swarm cells").await.unwrap();

        assert_eq!(Log::delete(&pool, log.id).await.unwrap(), 1);
        assert_eq!(Log::delete(&pool, log.id).await.unwrap(), 0);
        assert!(Log::find_by_id(&pool, log.id).await.unwrap().is_none());
    }

    #[test]
    fn test_update_validation() {
        assert_eq!(
            UpdateLog::default().validate(),
            Err(ValidationError::EmptyUpdate)
        );
        let blank = UpdateLog {
            content: Some("   ".to_string()),
            hive_id: None,
        };
        assert_eq!(blank.validate(), Err(ValidationError::MissingContent));
        let ok: UpdateLog = serde_json::from_str(r#"{"hiveID": 3}"#).unwrap();
        assert!(ok.validate().is_ok());
    }
}
