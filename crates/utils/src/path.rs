use std::path::PathBuf;

/// Expand a leading `~` to the current user's home directory.
///
/// Paths without a tilde are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
