use std::{path::PathBuf, time::Duration};

use sqlx::{
    Error, Executor, Pool, Sqlite,
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
        SqliteSynchronous,
    },
};
use tracing::info;
use utils::assets::database_path;

pub mod error;
pub mod models;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod validation;

pub use error::{StoreError, is_lock_timeout, is_unique_violation};

// ============================================================================
// Connection Pool Configuration
// ============================================================================

/// Default maximum connections in the pool.
/// SQLite benefits from limited connections due to single-writer model.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Minimum idle connections to maintain.
const DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Connection acquisition timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// How long a statement waits on another writer before failing with SQLITE_BUSY.
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;

/// Idle connection timeout in seconds (10 minutes).
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Connection settings for [`DBService`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// Lock-wait threshold; a writer blocked longer than this surfaces as a storage failure.
    pub busy_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DbConfig {
    /// Build the configuration from `BEEKEEPER_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            database_path: database_path(),
            max_connections: get_max_connections(),
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            busy_timeout: Duration::from_secs(get_busy_timeout_secs()),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    /// Configuration for a database file at `path` with default pool limits.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    pub fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }
}

/// Get max connections from environment or use default.
fn get_max_connections() -> u32 {
    std::env::var("BEEKEEPER_SQLITE_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&n| n > 0 && n <= 100)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

fn get_busy_timeout_secs() -> u64 {
    std::env::var("BEEKEEPER_SQLITE_BUSY_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_BUSY_TIMEOUT_SECS)
}

/// Apply performance pragmas to a SQLite connection.
/// These pragmas are applied on every new connection via `after_connect`.
///
/// - `temp_store = MEMORY` (2): Store temporary tables in memory
/// - `cache_size = -16000`: 16MB page cache (negative = KB)
/// - `wal_autocheckpoint = 1000`: SQLite's default, stated explicitly
async fn apply_performance_pragmas(conn: &mut SqliteConnection) -> Result<(), Error> {
    conn.execute("PRAGMA temp_store = 2").await?;
    conn.execute("PRAGMA cache_size = -16000").await?;
    conn.execute("PRAGMA wal_autocheckpoint = 1000").await?;
    Ok(())
}

/// Handle to the entity store. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open the database described by the environment and apply pending migrations.
    pub async fn new() -> Result<DBService, Error> {
        Self::new_with_config(DbConfig::from_env()).await
    }

    pub async fn new_with_config(config: DbConfig) -> Result<DBService, Error> {
        if let Some(parent) = config
            .database_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Initializing SQLite connection pool"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .after_connect(|conn, _meta| {
                Box::pin(async move { apply_performance_pragmas(conn).await })
            })
            .connect_with(config.connect_options())
            .await?;

        if has_pending_migrations(&pool).await {
            info!("Pending migrations detected, applying");
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        Ok(DBService { pool })
    }

    /// Wrap an already configured pool. The schema is assumed to be migrated.
    pub fn from_pool(pool: Pool<Sqlite>) -> DBService {
        DBService { pool }
    }
}

/// Check if there are pending migrations to run.
///
/// Compares the migrations in the codebase against the `_sqlx_migrations` table
/// to determine if any migrations need to be applied.
async fn has_pending_migrations(pool: &Pool<Sqlite>) -> bool {
    let migrator = sqlx::migrate!("./migrations");
    let applied: Vec<i64> = match sqlx::query_scalar::<_, i64>(
        "SELECT version FROM _sqlx_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    {
        Ok(versions) => versions,
        // Table doesn't exist yet
        Err(_) => return true,
    };

    migrator
        .iter()
        .any(|migration| !applied.contains(&migration.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_with_config_creates_schema() {
        let temp_dir = TempDir::new().unwrap();
        let config = DbConfig::for_path(temp_dir.path().join("nested/dir/beekeeper.sqlite"));

        let db = DBService::new_with_config(config).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('hives', 'logs', 'tasks') ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["hives", "logs", "tasks"]);
    }

    #[tokio::test]
    async fn test_reopen_skips_applied_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("beekeeper.sqlite");

        let first = DBService::new_with_config(DbConfig::for_path(&path))
            .await
            .unwrap();
        assert!(!has_pending_migrations(&first.pool).await);
        first.pool.close().await;

        let second = DBService::new_with_config(DbConfig::for_path(&path))
            .await
            .unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(&second.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_connections_enforce_foreign_keys() {
        let temp_dir = TempDir::new().unwrap();
        let db = DBService::new_with_config(DbConfig::for_path(
            temp_dir.path().join("beekeeper.sqlite"),
        ))
        .await
        .unwrap();

        let row = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        let enabled: i64 = row.get(0);
        assert_eq!(enabled, 1);

        let row = sqlx::query("PRAGMA journal_mode")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        let mode: String = row.get(0);
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
