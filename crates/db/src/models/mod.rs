//! Row models for the beekeeping record store.
//!
//! - [`hive`] - parent records keyed by the caller-chosen `hive_name`
//! - [`log`] / [`task`] - entries referencing a hive by that name
//! - [`entry`] - the closed set of entry kinds and their shared request shape

pub mod entry;
pub mod hive;
pub mod log;
pub mod task;
