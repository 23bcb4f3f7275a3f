//! Reads, updates and deletes of hives, logs and tasks.
//!
//! Each function touches one table (plus whatever the foreign keys cascade to)
//! and maps engine outcomes onto [`StoreError`]: a missing row is `NotFound`, a
//! duplicate hive name is `Conflict`, anything else is `Storage`.

use db::{
    StoreError, is_unique_violation,
    error::is_foreign_key_violation,
    models::{
        hive::{CreateHive, Hive, HiveWithEntries, UpdateHive},
        log::{Log, UpdateLog},
        task::{Task, UpdateTask},
    },
};
use sqlx::SqlitePool;
use tracing::{debug, info};

// ============================================================================
// Hives
// ============================================================================

/// Create a hive explicitly. Entry creation does this implicitly.
pub async fn create_hive(pool: &SqlitePool, data: &CreateHive) -> Result<Hive, StoreError> {
    let hive_name = data.validate()?;
    match Hive::create(pool, hive_name).await {
        Ok(hive) => {
            info!(hive_name, hive_id = hive.id, "Created hive");
            Ok(hive)
        }
        Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict { hive_name }),
        Err(e) => Err(e.into()),
    }
}

pub async fn list_hives(pool: &SqlitePool) -> Result<Vec<Hive>, StoreError> {
    Ok(Hive::find_all(pool).await?)
}

/// A hive with all of its logs and tasks.
pub async fn get_hive(pool: &SqlitePool, hive_name: i64) -> Result<HiveWithEntries, StoreError> {
    Hive::find_with_entries(pool, hive_name)
        .await?
        .ok_or_else(|| StoreError::not_found("hive", hive_name))
}

/// Rename a hive. Its logs and tasks follow the new name.
pub async fn rename_hive(
    pool: &SqlitePool,
    hive_name: i64,
    data: &UpdateHive,
) -> Result<Hive, StoreError> {
    let new_name = data.validate()?;
    match Hive::rename(pool, hive_name, new_name).await {
        Ok(Some(hive)) => {
            info!(hive_name, new_name, "Renamed hive");
            Ok(hive)
        }
        Ok(None) => Err(StoreError::not_found("hive", hive_name)),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
            hive_name: new_name,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Delete a hive together with its logs and tasks.
pub async fn delete_hive(pool: &SqlitePool, hive_name: i64) -> Result<(), StoreError> {
    let deleted = Hive::delete_by_name(pool, hive_name).await?;
    if deleted == 0 {
        return Err(StoreError::not_found("hive", hive_name));
    }
    info!(hive_name, "Deleted hive and its entries");
    Ok(())
}

// ============================================================================
// Logs
// ============================================================================

pub async fn list_logs(pool: &SqlitePool) -> Result<Vec<Log>, StoreError> {
    Ok(Log::find_all(pool).await?)
}

pub async fn get_log(pool: &SqlitePool, id: i64) -> Result<Log, StoreError> {
    Log::find_by_id(pool, id)
        .await?
        .ok_or_else(|| StoreError::not_found("log", id))
}

/// The most recently created log.
pub async fn last_log(pool: &SqlitePool) -> Result<Log, StoreError> {
    Log::find_last(pool)
        .await?
        .ok_or_else(|| StoreError::not_found("log", 0))
}

/// Apply a partial update. Moving a log to an unknown hive is `NotFound { entity: "hive" }`.
pub async fn update_log(pool: &SqlitePool, id: i64, data: &UpdateLog) -> Result<Log, StoreError> {
    data.validate()?;
    match Log::update(pool, id, data).await {
        Ok(Some(log)) => {
            debug!(entry_id = id, hive_name = log.hive_id, "Updated log");
            Ok(log)
        }
        Ok(None) => Err(StoreError::not_found("log", id)),
        Err(e) => Err(map_entry_write_error(e, data.hive_id)),
    }
}

pub async fn delete_log(pool: &SqlitePool, id: i64) -> Result<(), StoreError> {
    if Log::delete(pool, id).await? == 0 {
        return Err(StoreError::not_found("log", id));
    }
    debug!(entry_id = id, "Deleted log");
    Ok(())
}

// ============================================================================
// Tasks
// ============================================================================

pub async fn list_tasks(pool: &SqlitePool) -> Result<Vec<Task>, StoreError> {
    Ok(Task::find_all(pool).await?)
}

pub async fn get_task(pool: &SqlitePool, id: i64) -> Result<Task, StoreError> {
    Task::find_by_id(pool, id)
        .await?
        .ok_or_else(|| StoreError::not_found("task", id))
}

/// The most recently created task.
pub async fn last_task(pool: &SqlitePool) -> Result<Task, StoreError> {
    Task::find_last(pool)
        .await?
        .ok_or_else(|| StoreError::not_found("task", 0))
}

/// Apply a partial update. Moving a task to an unknown hive is `NotFound { entity: "hive" }`.
pub async fn update_task(
    pool: &SqlitePool,
    id: i64,
    data: &UpdateTask,
) -> Result<Task, StoreError> {
    data.validate()?;
    match Task::update(pool, id, data).await {
        Ok(Some(task)) => {
            debug!(entry_id = id, hive_name = task.hive_id, "Updated task");
            Ok(task)
        }
        Ok(None) => Err(StoreError::not_found("task", id)),
        Err(e) => Err(map_entry_write_error(e, data.hive_id)),
    }
}

pub async fn delete_task(pool: &SqlitePool, id: i64) -> Result<(), StoreError> {
    if Task::delete(pool, id).await? == 0 {
        return Err(StoreError::not_found("task", id));
    }
    debug!(entry_id = id, "Deleted task");
    Ok(())
}

fn map_entry_write_error(e: sqlx::Error, target_hive: Option<i64>) -> StoreError {
    match target_hive {
        Some(hive_name) if is_foreign_key_violation(&e) => StoreError::not_found("hive", hive_name),
        _ => StoreError::Storage(e),
    }
}
