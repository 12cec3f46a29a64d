//! Error types for theme state and preference persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the theme store, its watchers and the accessor.
///
/// All variants are local and recoverable. None of them leave the store in a
/// partially updated state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    /// The given text is not one of `light`, `dark` or `system`.
    #[error("invalid theme preference '{value}' (expected light, dark or system)")]
    InvalidPreference { value: String },

    /// The accessor was used with no live store behind it.
    #[error("theme store is not initialized")]
    NotInitialized,

    /// A store is already installed as the process-wide instance.
    #[error("theme store is already initialized")]
    AlreadyInitialized,

    /// A listener tried to change the preference while being notified.
    #[error("theme preference cannot be changed while listeners are being notified")]
    ReentrantMutation,

    /// `start` was called on a watcher that is already observing.
    #[error("system preference watcher is already started")]
    AlreadyStarted,
}

/// Errors raised by [`PreferenceStorage`](crate::storage::PreferenceStorage) backends.
///
/// The store never propagates these to callers; they are logged and the
/// in-memory state stays authoritative.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but does not hold a JSON object.
    #[error("malformed settings file '{}': {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    /// A stored preference value could not be parsed.
    #[error("stored theme preference '{value}' is not recognized")]
    InvalidValue { value: String },
}

/// Errors raised while loading a [`ThemeConfig`](crate::config::ThemeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid YAML for a theme config.
    #[error("invalid theme config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
