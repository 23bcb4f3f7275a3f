//! Entries are logs or tasks. Both reference a hive by name and carry free text.

use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};
use strum_macros::{Display, EnumString};

use super::{log::Log, task::Task};
use crate::validation::{ValidationError, require_content, require_hive_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    Log,
    Task,
}

/// A committed log or task row.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entry {
    Log(Log),
    Task(Task),
}

impl Entry {
    /// Insert an entry of `kind`. The referenced hive must exist.
    pub async fn create<'e, E>(
        executor: E,
        kind: EntryKind,
        hive_id: i64,
        content: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        match kind {
            EntryKind::Log => Log::create(executor, hive_id, content).await.map(Entry::Log),
            EntryKind::Task => Task::create(executor, hive_id, content)
                .await
                .map(Entry::Task),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Log(_) => EntryKind::Log,
            Entry::Task(_) => EntryKind::Task,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Entry::Log(log) => log.id,
            Entry::Task(task) => task.id,
        }
    }

    pub fn hive_id(&self) -> i64 {
        match self {
            Entry::Log(log) => log.hive_id,
            Entry::Task(task) => task.hive_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Entry::Log(log) => &log.content,
            Entry::Task(task) => &task.content,
        }
    }

    pub fn into_log(self) -> Option<Log> {
        match self {
            Entry::Log(log) => Some(log),
            Entry::Task(_) => None,
        }
    }

    pub fn into_task(self) -> Option<Task> {
        match self {
            Entry::Task(task) => Some(task),
            Entry::Log(_) => None,
        }
    }
}

/// Request body for creating a log or task, as received by the API layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEntry {
    pub content: Option<String>,
    #[serde(rename = "hiveID")]
    pub hive_id: Option<i64>,
}

/// A create request whose required fields are present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    pub hive_id: i64,
    pub content: String,
}

impl CreateEntry {
    pub fn validate(self) -> Result<ValidatedEntry, ValidationError> {
        let hive_id = require_hive_id(self.hive_id)?;
        let content = require_content(self.content)?;
        Ok(ValidatedEntry { hive_id, content })
    }
}
