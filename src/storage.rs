//! Persistence backends for the theme preference.
//!
//! The store reads the preference once at startup and writes it after every
//! successful change. Backends report failures as [`StorageError`]; the store
//! logs them and carries on with its in-memory state.
//!
//! # Settings file layout
//!
//! [`JsonFileStorage`] keeps the preference as one key of a JSON object so it
//! can share a settings file with the rest of an application:
//!
//! ```json
//! { "theme": "dark", "defaultExportPath": "", "gpuEnabled": true }
//! ```
//!
//! Only the configured key is rewritten on save. Everything else in the file
//! is preserved.

use std::cell::RefCell;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::mode::Preference;

/// Default key under which [`JsonFileStorage`] stores the preference.
pub const DEFAULT_STORAGE_KEY: &str = "theme";

/// Where a preference is loaded from and saved to.
pub trait PreferenceStorage {
    /// Returns the stored preference, or `None` if nothing was stored yet.
    fn load(&self) -> Result<Option<Preference>, StorageError>;

    /// Stores `preference`, replacing any previous value.
    fn save(&mut self, preference: Preference) -> Result<(), StorageError>;
}

/// In-memory storage.
///
/// Clones share the same slot, so a test can keep one clone to inspect what
/// the store persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Rc<RefCell<Option<Preference>>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage that already holds `preference`.
    pub fn with_preference(preference: Preference) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(preference))),
        }
    }

    /// The currently stored preference.
    pub fn stored(&self) -> Option<Preference> {
        *self.slot.borrow()
    }
}

impl PreferenceStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Preference>, StorageError> {
        Ok(self.stored())
    }

    fn save(&mut self, preference: Preference) -> Result<(), StorageError> {
        *self.slot.borrow_mut() = Some(preference);
        Ok(())
    }
}

/// Preference stored under one key of a JSON settings file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    key: String,
}

impl JsonFileStorage {
    /// Uses `path`, storing the preference under [`DEFAULT_STORAGE_KEY`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_key(path, DEFAULT_STORAGE_KEY)
    }

    /// Uses `path`, storing the preference under `key`.
    pub fn with_key(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// The settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The JSON key holding the preference.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_object(&self) -> Result<Option<Map<String, Value>>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Ok(Some(Map::new()));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(StorageError::Malformed {
                path: self.path.clone(),
                message: "expected a JSON object at the top level".to_string(),
            }),
            Err(e) => Err(StorageError::Malformed {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PreferenceStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<Preference>, StorageError> {
        let Some(map) = self.read_object()? else {
            return Ok(None);
        };

        match map.get(&self.key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| StorageError::InvalidValue { value: s.clone() }),
            Some(other) => Err(StorageError::InvalidValue {
                value: other.to_string(),
            }),
        }
    }

    fn save(&mut self, preference: Preference) -> Result<(), StorageError> {
        let mut map = self.read_object()?.unwrap_or_default();
        map.insert(
            self.key.clone(),
            Value::String(preference.as_str().to_string()),
        );

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let text = serde_json::to_string_pretty(&Value::Object(map)).map_err(|e| {
            StorageError::Malformed {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;

        // Write beside the target and rename over it, so a crash mid-write
        // never leaves the shared settings file half written.
        let mut temp = tempfile::Builder::new()
            .prefix(".settings")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| self.io_error(e))?;
        temp.write_all(text.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;
        temp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

/// The default settings file for `app_name`: `<config dir>/<app_name>/settings.json`.
///
/// Returns `None` when the platform has no configuration directory.
pub fn default_storage_path(app_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(app_name).join("settings.json"))
}
