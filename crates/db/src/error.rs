//! Error taxonomy shared by the store, the resolver and the entry creator.

use sqlx::Error as SqlxError;
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing or malformed input, rejected before any storage work.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: i64 },

    /// A uniqueness violation on `hive_name` that got past the hive lock.
    #[error("hive {hive_name} already exists")]
    Conflict { hive_name: i64 },

    /// Engine-level failure: connection loss, lock-wait timeout, constraint failure.
    #[error("storage failure: {0}")]
    Storage(#[source] SqlxError),
}

impl From<SqlxError> for StoreError {
    fn from(e: SqlxError) -> Self {
        StoreError::Storage(e)
    }
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: i64) -> Self {
        StoreError::NotFound { entity, key }
    }

    /// Only a hive conflict may be retried: re-resolving finds the competing row.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// True when the failure was a lock wait exceeding the busy timeout.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, StoreError::Storage(e) if is_lock_timeout(e))
    }
}

/// Check if an error is a UNIQUE or PRIMARY KEY constraint violation.
pub fn is_unique_violation(e: &SqlxError) -> bool {
    matches!(e, SqlxError::Database(db_err) if db_err.is_unique_violation())
}

/// Check if an error is a FOREIGN KEY constraint violation.
pub fn is_foreign_key_violation(e: &SqlxError) -> bool {
    matches!(e, SqlxError::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Check if an error means a lock could not be acquired in time.
///
/// SQLite error codes considered lock waits:
/// - 5 = SQLITE_BUSY (database is locked by another connection)
/// - 6 = SQLITE_LOCKED (table is locked within a transaction)
/// - extended variants of both, e.g. 517 = SQLITE_BUSY_SNAPSHOT
///
/// Extended codes carry the primary code in their low byte.
pub fn is_lock_timeout(e: &SqlxError) -> bool {
    let SqlxError::Database(db_err) = e else {
        return false;
    };
    db_err
        .code()
        .and_then(|code| code.parse::<u32>().ok())
        .is_some_and(|code| matches!(code & 0xFF, 5 | 6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(StoreError::Conflict { hive_name: 42 }.is_retryable());
        assert!(!StoreError::not_found("log", 1).is_retryable());
        assert!(!StoreError::Storage(SqlxError::PoolTimedOut).is_retryable());
        assert!(!StoreError::Validation(ValidationError::MissingContent).is_retryable());
    }

    #[test]
    fn test_non_database_errors_are_not_classified() {
        assert!(!is_lock_timeout(&SqlxError::PoolTimedOut));
        assert!(!is_unique_violation(&SqlxError::RowNotFound));
        assert!(!is_foreign_key_violation(&SqlxError::RowNotFound));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::not_found("hive", 7).to_string(),
            "hive 7 not found"
        );
        assert_eq!(
            StoreError::Conflict { hive_name: 42 }.to_string(),
            "hive 42 already exists"
        );
    }
}
