//! Default on-disk locations.

use std::path::PathBuf;

/// Config file path (~/.config/scrollback/config.toml).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("scrollback").join("config.toml"))
}

/// Get the default database path.
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scrollback")
        .join("feed.db")
}
