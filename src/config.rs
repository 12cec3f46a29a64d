//! Configuration for building a [`ThemeStore`](crate::ThemeStore).
//!
//! Configs are plain serde structs and load from YAML, with every field
//! optional:
//!
//! ```yaml
//! default_preference: light
//! storage_key: appearance
//! storage_path: /home/me/.config/myapp/settings.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mode::Preference;
use crate::storage::{default_storage_path, JsonFileStorage, DEFAULT_STORAGE_KEY};

/// Application name used for the default settings location.
pub const DEFAULT_APP_NAME: &str = "umbra";

/// Theme store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Preference used when storage holds none (or cannot be read).
    pub default_preference: Preference,
    /// JSON key holding the preference in the settings file.
    pub storage_key: String,
    /// Settings file. Falls back to [`default_storage_path`] when unset.
    pub storage_path: Option<PathBuf>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            default_preference: Preference::System,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_path: None,
        }
    }
}

impl ThemeConfig {
    /// Parses a config from YAML text.
    ///
    /// ```rust
    /// use umbra::{Preference, ThemeConfig};
    ///
    /// let config = ThemeConfig::from_yaml("default_preference: dark").unwrap();
    /// assert_eq!(config.default_preference, Preference::Dark);
    /// assert_eq!(config.storage_key, "theme");
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a YAML config file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// The settings file this config points at, if one can be determined.
    pub fn resolved_storage_path(&self) -> Option<PathBuf> {
        self.storage_path
            .clone()
            .or_else(|| default_storage_path(DEFAULT_APP_NAME))
    }

    /// Builds file storage for this config.
    ///
    /// Returns `None` when no path is configured and the platform has no
    /// configuration directory.
    pub fn file_storage(&self) -> Option<JsonFileStorage> {
        self.resolved_storage_path()
            .map(|path| JsonFileStorage::with_key(path, self.storage_key.clone()))
    }
}
