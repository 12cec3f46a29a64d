//! # Umbra - light/dark theme state for applications
//!
//! Umbra keeps one piece of application state: which color mode the UI should
//! be drawn in. The user picks a [`Preference`] (`light`, `dark` or `system`);
//! the store reconciles it with the host's ambient setting into a concrete
//! [`ColorMode`] and tells every subscriber when that value changes.
//!
//! ## Pieces
//!
//! - [`ThemeStore`]: owns the preference and the resolved mode; persistence,
//!   recomputation and notification
//! - [`SystemPreferenceWatcher`]: pushes the host's light/dark signal into the
//!   store ([`OsWatcher`] for the OS setting, [`ManualWatcher`] for host-driven
//!   signals and tests)
//! - [`ThemeAccessor`]: the facade consumers use, optionally through the
//!   application-wide store in [`accessor`]
//! - [`PreferenceStorage`]: where the preference lives between runs
//!   ([`JsonFileStorage`], [`MemoryStorage`])
//!
//! ## Quick start
//!
//! ```rust
//! use umbra::{ColorMode, ManualWatcher, MemoryStorage, Preference, ThemeStore};
//!
//! let watcher = ManualWatcher::new(ColorMode::Dark);
//! let system = watcher.emitter();
//!
//! let store = ThemeStore::builder()
//!     .storage(MemoryStorage::new())
//!     .watcher(watcher)
//!     .build()
//!     .unwrap();
//!
//! // Nothing stored yet: follow the system.
//! assert_eq!(store.resolved_theme(), ColorMode::Dark);
//!
//! system.emit(ColorMode::Light);
//! assert_eq!(store.resolved_theme(), ColorMode::Light);
//!
//! // A manual choice wins over the system from now on.
//! store.set_preference(Preference::Dark).unwrap();
//! system.emit(ColorMode::Dark);
//! system.emit(ColorMode::Light);
//! assert_eq!(store.resolved_theme(), ColorMode::Dark);
//! ```
//!
//! In a real application, build the store with [`ThemeStore::builder`] and a
//! [`ThemeConfig`] so the preference is read from and written to the user's
//! settings file, and the ambient mode comes from the OS.
//!
//! ## Threading
//!
//! Everything here is single-threaded: handles use `Rc` and are not `Send`.
//! Create the store on the UI thread and keep all mutation there.

pub mod accessor;
pub mod config;
mod detect;
pub mod error;
mod mode;
pub mod storage;
mod store;
pub mod watcher;

pub use accessor::{use_theme, ThemeAccessor};
pub use config::ThemeConfig;
pub use detect::{detect_color_mode, reset_theme_detector, set_theme_detector, ThemeDetector};
pub use error::{ConfigError, StorageError, ThemeError};
pub use mode::{AmbientSystemTheme, ColorMode, Preference, ResolvedTheme};
pub use storage::{default_storage_path, JsonFileStorage, MemoryStorage, PreferenceStorage};
pub use store::{Subscription, ThemeStore, ThemeStoreBuilder};
pub use watcher::{
    AmbientCallback, AmbientEmitter, ManualWatcher, OsRefresher, OsWatcher,
    SystemPreferenceWatcher,
};
