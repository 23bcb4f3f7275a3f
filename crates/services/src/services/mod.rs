//! Service modules for the beekeeping store.
//!
//! - [`hive_resolver`] - find-or-create of a hive inside a caller's transaction
//! - [`entry_creator`] - atomic creation of a log or task together with its hive
//! - [`records`] - plain reads, updates and deletes of hives, logs and tasks

pub mod entry_creator;
pub mod hive_resolver;
pub mod records;
