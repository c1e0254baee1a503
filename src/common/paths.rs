//! Configuration paths and file-under-test path helpers

use std::path::{Path, PathBuf};

/// Application name used for platform directories
const APP_NAME: &str = "expect-test";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/expect-test/`
/// - macOS: `~/Library/Application Support/expect-test/`
/// - Windows: `%APPDATA%\expect-test\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve a path for identity comparison
///
/// Canonicalizes when the file exists, otherwise falls back to the lexical
/// absolute form so that paths reported by a test program still compare
/// equal after the build output has been removed.
pub fn resolve(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Sibling path the corrected source is written to: `<file><suffix>`
pub fn corrected_path(file: &Path, suffix: &str) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
