//! Required-field validation for inbound requests.
//!
//! The API layer runs these checks before calling into the store or the entry
//! creator, so a rejected request never touches the database.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("hiveID is required")]
    MissingHiveId,

    #[error("hiveName is required")]
    MissingHiveName,

    #[error("content is required and must not be blank")]
    MissingContent,

    #[error("update contains no fields")]
    EmptyUpdate,
}

/// Require a hive identifier.
pub fn require_hive_id(hive_id: Option<i64>) -> Result<i64, ValidationError> {
    hive_id.ok_or(ValidationError::MissingHiveId)
}

/// Require content that is present and not whitespace-only.
pub fn require_content(content: Option<String>) -> Result<String, ValidationError> {
    match content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(ValidationError::MissingContent),
    }
}

/// Reject content that was supplied but is blank. Absent content is fine.
pub fn validate_optional_content(content: Option<&str>) -> Result<(), ValidationError> {
    match content {
        Some(content) if content.trim().is_empty() => Err(ValidationError::MissingContent),
        _ => Ok(()),
    }
}
