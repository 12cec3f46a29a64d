//! Read/write facade over a [`ThemeStore`] for consuming code.
//!
//! Consumers get a [`ThemeAccessor`] either from a store they were handed
//! ([`ThemeStore::accessor`]) or from the application-wide store installed with
//! [`init`] ([`use_theme`]). The accessor holds no state of its own and does
//! not keep the store alive: once the store is gone every call fails with
//! [`ThemeError::NotInitialized`].
//!
//! ```rust
//! use umbra::accessor;
//! use umbra::{ColorMode, ManualWatcher, MemoryStorage, Preference, ThemeError, ThemeStore};
//!
//! assert_eq!(accessor::use_theme().unwrap_err(), ThemeError::NotInitialized);
//!
//! let store = ThemeStore::builder()
//!     .storage(MemoryStorage::new())
//!     .watcher(ManualWatcher::new(ColorMode::Dark))
//!     .build()
//!     .unwrap();
//! accessor::init(store).unwrap();
//!
//! let theme = accessor::use_theme().unwrap();
//! assert_eq!(theme.theme().unwrap(), Preference::System);
//! assert_eq!(theme.resolved_theme().unwrap(), ColorMode::Dark);
//! theme.set_theme(Preference::Light).unwrap();
//!
//! accessor::teardown();
//! assert_eq!(theme.resolved_theme().unwrap_err(), ThemeError::NotInitialized);
//! ```

use std::cell::RefCell;
use std::rc::Weak;

use crate::error::ThemeError;
use crate::mode::{ColorMode, Preference};
use crate::store::{Inner, Subscription, ThemeStore};

thread_local! {
    static CURRENT: RefCell<Option<ThemeStore>> = const { RefCell::new(None) };
}

/// Installs `store` as the application-wide theme store.
///
/// The store is tied to the calling thread, which should be the UI thread.
///
/// # Errors
///
/// Returns [`ThemeError::AlreadyInitialized`] if a store is already installed.
pub fn init(store: ThemeStore) -> Result<ThemeAccessor, ThemeError> {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        if current.is_some() {
            return Err(ThemeError::AlreadyInitialized);
        }
        let accessor = store.accessor();
        *current = Some(store);
        Ok(accessor)
    })
}

/// Removes the application-wide store and stops its watcher.
///
/// Returns the store so callers can keep using it; when dropped (and no
/// other handle exists) existing accessors start failing with
/// [`ThemeError::NotInitialized`]. Returns `None` if nothing was installed.
pub fn teardown() -> Option<ThemeStore> {
    let store = CURRENT.with(|current| current.borrow_mut().take());
    if let Some(store) = &store {
        store.shutdown();
        log::info!("theme store torn down");
    }
    store
}

/// Whether an application-wide store is installed.
pub fn is_initialized() -> bool {
    CURRENT.with(|current| current.borrow().is_some())
}

/// Returns an accessor for the application-wide store.
///
/// # Errors
///
/// Returns [`ThemeError::NotInitialized`] before [`init`] or after [`teardown`].
pub fn use_theme() -> Result<ThemeAccessor, ThemeError> {
    CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .map(ThemeStore::accessor)
            .ok_or(ThemeError::NotInitialized)
    })
}

/// Returns the application-wide resolved mode.
pub fn use_resolved_theme() -> Result<ColorMode, ThemeError> {
    use_theme()?.resolved_theme()
}

/// Thin facade exposing `theme`, `resolved_theme` and `set_theme`.
#[derive(Debug, Clone)]
pub struct ThemeAccessor {
    store: Weak<Inner>,
}

impl ThemeAccessor {
    /// Creates an accessor for `store`.
    pub fn new(store: &ThemeStore) -> Self {
        Self {
            store: store.downgrade(),
        }
    }

    fn store(&self) -> Result<ThemeStore, ThemeError> {
        ThemeStore::from_weak(&self.store).ok_or(ThemeError::NotInitialized)
    }

    /// The user's preference.
    pub fn theme(&self) -> Result<Preference, ThemeError> {
        Ok(self.store()?.preference())
    }

    /// The concrete mode to render with.
    pub fn resolved_theme(&self) -> Result<ColorMode, ThemeError> {
        Ok(self.store()?.resolved_theme())
    }

    /// Changes the preference.
    pub fn set_theme(&self, preference: Preference) -> Result<(), ThemeError> {
        self.store()?.set_preference(preference)
    }

    /// Parses and changes the preference.
    pub fn set_theme_str(&self, value: &str) -> Result<(), ThemeError> {
        self.store()?.set_preference_str(value)
    }

    /// Advances the light, dark, system toggle.
    pub fn cycle_theme(&self) -> Result<Preference, ThemeError> {
        self.store()?.cycle_preference()
    }

    /// Subscribes to resolved mode changes.
    pub fn subscribe<F>(&self, listener: F) -> Result<Subscription, ThemeError>
    where
        F: FnMut(ColorMode) + 'static,
    {
        Ok(self.store()?.subscribe(listener))
    }
}

impl ThemeStore {
    /// Returns an accessor bound to this store.
    pub fn accessor(&self) -> ThemeAccessor {
        ThemeAccessor::new(self)
    }
}
