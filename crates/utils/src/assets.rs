use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

/// Directory holding the database and log files.
///
/// Debug builds keep everything under `dev_assets/` at the workspace root so
/// local runs never touch the user's real data. The directory is not created
/// here; callers that write into it create it and surface the I/O error.
pub fn asset_dir() -> PathBuf {
    if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("org", "beekeeper", "beekeeper")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
    // ✔ macOS → ~/Library/Application Support/beekeeper
    // ✔ Linux → ~/.local/share/beekeeper   (respects XDG_DATA_HOME)
    // ✔ Windows → %APPDATA%\beekeeper\beekeeper
}

/// Get the database file path.
///
/// Respects the `BEEKEEPER_DATABASE_PATH` environment variable for custom locations.
/// Supports tilde expansion (e.g., `~/beekeeper/beekeeper.sqlite`).
///
/// Default: `{asset_dir}/beekeeper.sqlite`
pub fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var("BEEKEEPER_DATABASE_PATH") {
        return crate::path::expand_tilde(&path);
    }
    asset_dir().join("beekeeper.sqlite")
}

/// Get the log directory path.
///
/// Respects the `BEEKEEPER_LOG_DIR` environment variable.
///
/// Default: `{asset_dir}/logs`
pub fn log_dir() -> PathBuf {
    if let Ok(path) = std::env::var("BEEKEEPER_LOG_DIR") {
        return crate::path::expand_tilde(&path);
    }
    asset_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_database_path_default() {
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::remove_var("BEEKEEPER_DATABASE_PATH") };
        let path = database_path();
        assert!(path.ends_with("beekeeper.sqlite"));
    }

    #[test]
    #[serial]
    fn test_database_path_env_override() {
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::set_var("BEEKEEPER_DATABASE_PATH", "/custom/path/hives.db") };
        let path = database_path();
        unsafe { env::remove_var("BEEKEEPER_DATABASE_PATH") };
        assert_eq!(path, PathBuf::from("/custom/path/hives.db"));
    }

    #[test]
    #[serial]
    fn test_database_path_tilde_expansion() {
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::set_var("BEEKEEPER_DATABASE_PATH", "~/beekeeper/db.sqlite") };
        let path = database_path();
        unsafe { env::remove_var("BEEKEEPER_DATABASE_PATH") };
        assert!(!path.to_string_lossy().contains('~'));
    }

    #[test]
    #[serial]
    fn test_log_dir_default_and_override() {
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::remove_var("BEEKEEPER_LOG_DIR") };
        assert!(log_dir().ends_with("logs"));

        unsafe { env::set_var("BEEKEEPER_LOG_DIR", "/tmp/beekeeper-logs") };
        let dir = log_dir();
        unsafe { env::remove_var("BEEKEEPER_LOG_DIR") };
        assert_eq!(dir, PathBuf::from("/tmp/beekeeper-logs"));
    }
}
