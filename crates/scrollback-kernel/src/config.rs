//! Server-side feed configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file at all) is a valid configuration.
//!
//! ```toml
//! max_page_size = 100
//! default_page_size = 20
//! database = "/var/lib/scrollback/feed.db"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Ceiling on `first`/`last` when no config overrides it.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Page size clients get when they don't ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Error type for config operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Invalid(String),
}

/// Feed limits and storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Largest window a single request may ask for.
    pub max_page_size: u32,

    /// Window size used by clients and the CLI when none is given.
    pub default_page_size: u32,

    /// SQLite database path. `None` means the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            default_page_size: DEFAULT_PAGE_SIZE,
            database: None,
        }
    }
}

impl FeedConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".into()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be within 1..={}, got {}",
                self.max_page_size, self.default_page_size
            )));
        }
        Ok(())
    }
}
