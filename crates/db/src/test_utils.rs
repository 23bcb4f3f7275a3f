//! Test utilities for database tests.
//!
//! This module provides helper functions for creating test database pools.
//! Every pool is backed by its own file in a fresh temp directory, copied from a
//! template database that already has the migrations applied.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tempfile::TempDir;
use tokio::sync::OnceCell;

use crate::DBService;

/// Busy timeout for test pools; long enough for the concurrency tests to queue up.
const TEST_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

static TEMPLATE_DIR: OnceLock<TempDir> = OnceLock::new();
static TEMPLATE_READY: OnceCell<()> = OnceCell::const_new();

fn get_template_dir() -> &'static TempDir {
    TEMPLATE_DIR.get_or_init(|| TempDir::new().expect("Failed to create template temp dir"))
}

/// Ensure the template database is ready (migrations applied).
async fn ensure_template_ready() {
    TEMPLATE_READY
        .get_or_init(|| async {
            let template_path = get_template_dir().path().join("template.db");

            let options =
                SqliteConnectOptions::from_str(&format!("sqlite://{}", template_path.display()))
                    .expect("Invalid template database URL")
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal);

            let pool = SqlitePoolOptions::new()
                .min_connections(0)
                .max_connections(1)
                .connect_with(options)
                .await
                .expect("Failed to create template pool");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations on template");

            // Close the pool so the WAL is checkpointed into the main file
            pool.close().await;

            tracing::debug!("Template database ready at {:?}", template_path);
        })
        .await;
}

/// Create a test database pool with migrations applied.
///
/// Returns the pool and a TempDir that must be kept alive for the duration of the test.
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
    create_test_pool_with_busy_timeout(TEST_BUSY_TIMEOUT).await
}

/// Like [`create_test_pool`], with a custom lock-wait threshold.
pub async fn create_test_pool_with_busy_timeout(busy_timeout: Duration) -> (SqlitePool, TempDir) {
    ensure_template_ready().await;

    let temp_dir = TempDir::new().expect("Failed to create test temp dir");
    let db_path = temp_dir.path().join("test.db");

    let template_path = get_template_dir().path().join("template.db");
    std::fs::copy(&template_path, &db_path).expect("Failed to copy template database");

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .expect("Invalid test database URL")
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await
        .expect("Failed to create test pool");

    (pool, temp_dir)
}

/// A [`DBService`] over a fresh test pool.
pub async fn create_test_db() -> (DBService, TempDir) {
    let (pool, temp_dir) = create_test_pool().await;
    (DBService::from_pool(pool), temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_pool() {
        let (pool, _temp_dir) = create_test_pool().await;

        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hives")
            .fetch_one(&pool)
            .await
            .expect("Failed to query hives table");

        assert_eq!(result.0, 0);
    }

    #[tokio::test]
    async fn test_template_reuse_gives_isolated_databases() {
        let (pool1, _temp1) = create_test_pool().await;
        let (pool2, _temp2) = create_test_pool().await;

        sqlx::query("INSERT INTO hives (hive_name) VALUES (1)")
            .execute(&pool1)
            .await
            .expect("Insert into pool 1 should work");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hives")
            .fetch_one(&pool2)
            .await
            .expect("Pool 2 should work");
        assert_eq!(count.0, 0);
    }
}
