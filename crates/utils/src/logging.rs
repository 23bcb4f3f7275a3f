//! Logging bootstrap for processes embedding the beekeeper crates.
//!
//! Console output is always enabled. When `BEEKEEPER_FILE_LOGGING` is set,
//! events are also written as JSON lines to a daily rotating file.
//!
//! # Configuration
//!
//! - `BEEKEEPER_FILE_LOGGING`: Set to "true" or "1" to enable file logging
//! - `BEEKEEPER_LOG_DIR`: Override default log directory (defaults to `{asset_dir}/logs`)
//! - `BEEKEEPER_LOG_MAX_FILES`: Number of daily log files to retain (default: 7)

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::assets::log_dir;

const LOG_FILE_PREFIX: &str = "beekeeper.log";

/// Configuration for file logging.
#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    /// Whether file logging is enabled.
    pub enabled: bool,
    /// Directory to write log files to.
    pub log_dir: PathBuf,
    /// Number of daily log files to retain.
    pub max_files: usize,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        let enabled = std::env::var("BEEKEEPER_FILE_LOGGING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_files = std::env::var("BEEKEEPER_LOG_MAX_FILES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(7);

        Self {
            enabled,
            log_dir: log_dir(),
            max_files,
        }
    }
}

/// Filter directives scoping `log_level` to the workspace crates.
pub fn filter_directives(log_level: &str) -> String {
    format!(
        "warn,services={level},db={level},utils={level}",
        level = log_level
    )
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(filter_directives(log_level)).unwrap_or_else(|e| {
        eprintln!("Invalid log level {log_level:?} ({e}), falling back to info");
        EnvFilter::new(filter_directives("info"))
    })
}

/// Initialize the logging system with optional file output.
///
/// Returns a guard that must be held for the lifetime of the application
/// to ensure all logs are flushed. If file logging is not enabled, returns None.
/// Calling this twice leaves the first subscriber in place.
pub fn init_logging(log_level: &str) -> Option<WorkerGuard> {
    let config = FileLoggingConfig::default();

    let console_layer = tracing_subscriber::fmt::layer().with_filter(build_filter(log_level));

    if !config.enabled {
        let _ = tracing_subscriber::registry().with(console_layer).try_init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory {:?}: {}", config.log_dir, e);
        let _ = tracing_subscriber::registry().with(console_layer).try_init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(build_filter(log_level));

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    tracing::info!(
        log_dir = ?config.log_dir,
        max_files = config.max_files,
        "File logging enabled"
    );

    let log_dir = config.log_dir.clone();
    let max_files = config.max_files;
    std::thread::spawn(move || {
        cleanup_old_logs(&log_dir, max_files);
    });

    Some(guard)
}

/// Remove rotated log files beyond the newest `max_files`.
fn cleanup_old_logs(log_dir: &Path, max_files: usize) {
    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        })
        .filter_map(|e| {
            e.metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|t| (e.path(), t))
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
        } else {
            tracing::debug!("Removed old log file: {:?}", path);
        }
    }
}
