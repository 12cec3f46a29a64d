//! The theme store: single source of truth for the preference and the resolved mode.
//!
//! # Model
//!
//! The store holds three values:
//!
//! - the user's [`Preference`] (`light`, `dark` or `system`)
//! - the last ambient [`ColorMode`] reported by the host
//! - the resolved [`ColorMode`], always `preference.resolve(ambient)`
//!
//! The resolved value changes through exactly two entry points:
//! [`ThemeStore::set_preference`] (user driven) and
//! [`ThemeStore::on_ambient_change`] (environment driven, only visible while
//! the preference is `system`). Each call runs to completion, notifying every
//! listener in subscription order, before the next one is processed.
//! Listeners only hear about real changes.
//!
//! # Reentrancy
//!
//! Listeners must not change the preference while being notified. Doing so
//! fails with [`ThemeError::ReentrantMutation`] and leaves the store untouched.
//! Ambient changes that arrive mid-notification are held back and applied as
//! soon as the current round finishes; only the latest one is kept.
//!
//! Subscribing and unsubscribing from inside a listener is fine. A listener
//! removed mid-round is not called for the rest of that round; a listener
//! added mid-round first hears the next change.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use umbra::{ColorMode, ManualWatcher, MemoryStorage, Preference, ThemeStore};
//!
//! let watcher = ManualWatcher::new(ColorMode::Dark);
//! let system = watcher.emitter();
//! let store = ThemeStore::builder()
//!     .storage(MemoryStorage::new())
//!     .watcher(watcher)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(store.preference(), Preference::System);
//! assert_eq!(store.resolved_theme(), ColorMode::Dark);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = store.subscribe(move |mode| sink.borrow_mut().push(mode));
//!
//! store.set_preference(Preference::Light).unwrap();
//! system.emit(ColorMode::Light); // ignored: preference is not `system`
//! store.set_preference(Preference::System).unwrap(); // ambient is light now, no change
//!
//! assert_eq!(*seen.borrow(), vec![ColorMode::Light]);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::ThemeConfig;
use crate::error::ThemeError;
use crate::mode::{ColorMode, Preference};
use crate::storage::{MemoryStorage, PreferenceStorage};
use crate::watcher::{OsWatcher, SystemPreferenceWatcher};

type Listener = Box<dyn FnMut(ColorMode)>;

struct ListenerSlot {
    id: u64,
    callback: Rc<RefCell<Listener>>,
}

#[derive(Debug, Clone, Copy)]
struct State {
    preference: Preference,
    ambient: ColorMode,
    resolved: ColorMode,
}

impl State {
    fn new(preference: Preference, ambient: ColorMode) -> Self {
        Self {
            preference,
            ambient,
            resolved: preference.resolve(ambient),
        }
    }
}

pub(crate) struct Inner {
    state: Cell<State>,
    listeners: RefCell<Vec<ListenerSlot>>,
    next_listener_id: Cell<u64>,
    notifying: Cell<bool>,
    pending_ambient: Cell<Option<ColorMode>>,
    storage: RefCell<Box<dyn PreferenceStorage>>,
    watcher: RefCell<Option<Box<dyn SystemPreferenceWatcher>>>,
}

// Resets the notification flag even if a listener panics.
struct NotifyingGuard<'a>(&'a Cell<bool>);

impl<'a> NotifyingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Inner {
    fn set_preference(&self, preference: Preference) -> Result<(), ThemeError> {
        if self.notifying.get() {
            log::warn!("rejected theme preference change to '{preference}' during notification");
            return Err(ThemeError::ReentrantMutation);
        }

        if let Err(e) = self.storage.borrow_mut().save(preference) {
            log::warn!("failed to persist theme preference '{preference}': {e}");
        }

        let state = self.state.get();
        log::debug!(
            "theme preference changed: {} -> {preference}",
            state.preference
        );
        self.commit(State::new(preference, state.ambient));
        Ok(())
    }

    fn on_ambient_change(&self, ambient: ColorMode) {
        if self.notifying.get() {
            self.pending_ambient.set(Some(ambient));
            return;
        }

        let state = self.state.get();
        if !state.preference.follows_system() {
            log::debug!(
                "system color mode is now {ambient}; keeping manual preference '{}'",
                state.preference
            );
        }
        self.commit(State::new(state.preference, ambient));
    }

    fn commit(&self, next: State) {
        let previous = self.state.replace(next);
        if previous.resolved != next.resolved {
            log::debug!("resolved theme changed: {} -> {}", previous.resolved, next.resolved);
            self.notify(next.resolved);
        }
    }

    fn notify(&self, mode: ColorMode) {
        {
            let _guard = NotifyingGuard::enter(&self.notifying);
            let snapshot: Vec<(u64, Rc<RefCell<Listener>>)> = self
                .listeners
                .borrow()
                .iter()
                .map(|slot| (slot.id, Rc::clone(&slot.callback)))
                .collect();

            for (id, callback) in snapshot {
                if !self.is_subscribed(id) {
                    continue;
                }
                let mut listener = callback.borrow_mut();
                (*listener)(mode);
            }
        }

        if let Some(ambient) = self.pending_ambient.take() {
            self.on_ambient_change(ambient);
        }
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.listeners.borrow().iter().any(|slot| slot.id == id)
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.borrow_mut().retain(|slot| slot.id != id);
    }

    fn stop_watcher(&self) {
        if let Some(watcher) = self.watcher.borrow_mut().as_mut() {
            if watcher.is_started() {
                watcher.stop();
                log::info!("stopped system color mode watcher");
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().as_mut() {
            watcher.stop();
        }
    }
}

/// Shared handle to the theme state.
///
/// Cloning is cheap and every clone refers to the same store. The store lives
/// until the last handle is dropped, at which point the watcher is stopped.
/// Handles are not `Send`: the store belongs to the UI thread.
///
/// A listener that captures a `ThemeStore` clone keeps the store alive through
/// its own listener list: the store is then never dropped and its watcher never
/// stops. Inside listeners use a [`ThemeAccessor`](crate::ThemeAccessor), which
/// only holds a weak reference, or call [`shutdown`](Self::shutdown) explicitly.
#[derive(Clone)]
pub struct ThemeStore {
    inner: Rc<Inner>,
}

impl ThemeStore {
    /// Starts building a store.
    pub fn builder() -> ThemeStoreBuilder {
        ThemeStoreBuilder::new()
    }

    /// The user's current preference.
    pub fn preference(&self) -> Preference {
        self.inner.state.get().preference
    }

    /// The concrete mode currently applied.
    pub fn resolved_theme(&self) -> ColorMode {
        self.inner.state.get().resolved
    }

    /// The last ambient mode reported by the watcher.
    pub fn ambient(&self) -> ColorMode {
        self.inner.state.get().ambient
    }

    /// Changes the preference.
    ///
    /// The new preference is persisted (failures are logged, not returned),
    /// the resolved mode is recomputed, and listeners are notified if it changed.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::ReentrantMutation`] when called from a listener.
    pub fn set_preference(&self, preference: Preference) -> Result<(), ThemeError> {
        self.inner.set_preference(preference)
    }

    /// Parses `value` and changes the preference.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::InvalidPreference`] if `value` is not `light`,
    /// `dark` or `system`; nothing is persisted or notified in that case.
    pub fn set_preference_str(&self, value: &str) -> Result<(), ThemeError> {
        let preference = value.parse()?;
        self.set_preference(preference)
    }

    /// Moves to the next preference in the light, dark, system cycle.
    pub fn cycle_preference(&self) -> Result<Preference, ThemeError> {
        let next = self.preference().next();
        self.set_preference(next)?;
        Ok(next)
    }

    /// Reports a new ambient mode from the host environment.
    ///
    /// Watchers call this through the callback installed at build time. It is
    /// public so hosts with their own native signal can drive a store directly.
    pub fn on_ambient_change(&self, ambient: ColorMode) {
        self.inner.on_ambient_change(ambient);
    }

    /// Registers `listener`, called with the new resolved mode on every change.
    ///
    /// Dropping the returned [`Subscription`] does not unsubscribe; call
    /// [`Subscription::unsubscribe`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(ColorMode) + 'static,
    {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner.listeners.borrow_mut().push(ListenerSlot {
            id,
            callback: Rc::new(RefCell::new(Box::new(listener))),
        });
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
            active: Cell::new(true),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Stops observing the host environment. Idempotent.
    ///
    /// The store keeps working from its in-memory state; ambient changes are
    /// no longer picked up.
    pub fn shutdown(&self) {
        self.inner.stop_watcher();
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(&self, other: &ThemeStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ThemeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.get();
        f.debug_struct("ThemeStore")
            .field("preference", &state.preference)
            .field("ambient", &state.ambient)
            .field("resolved", &state.resolved)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle for removing a listener.
#[derive(Debug)]
pub struct Subscription {
    store: Weak<Inner>,
    id: u64,
    active: Cell<bool>,
}

impl Subscription {
    /// Removes the listener. Only the first call has an effect.
    pub fn unsubscribe(&self) {
        if self.active.replace(false) {
            if let Some(inner) = self.store.upgrade() {
                inner.unsubscribe(self.id);
            }
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not been called yet.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// Builder for [`ThemeStore`].
///
/// ```rust
/// use umbra::{ColorMode, ManualWatcher, MemoryStorage, Preference, ThemeStore};
///
/// let store = ThemeStore::builder()
///     .default_preference(Preference::Light)
///     .storage(MemoryStorage::new())
///     .watcher(ManualWatcher::new(ColorMode::Dark))
///     .build()
///     .unwrap();
///
/// assert_eq!(store.resolved_theme(), ColorMode::Light);
/// ```
pub struct ThemeStoreBuilder {
    default_preference: Preference,
    storage: Option<Box<dyn PreferenceStorage>>,
    watcher: Option<Box<dyn SystemPreferenceWatcher>>,
}

impl ThemeStoreBuilder {
    /// Creates a builder with `system` as default preference, in-memory storage
    /// and OS detection.
    ///
    /// The default watcher is an [`OsWatcher`]. The OS setting is read once at
    /// build time and only re-read when the host calls
    /// [`OsRefresher::refresh`](crate::OsRefresher::refresh); nothing notices
    /// OS changes on its own. Keep a refresher (or supply a [`ManualWatcher`](crate::ManualWatcher)
    /// fed by a native event) if the store should follow the system live.
    pub fn new() -> Self {
        Self {
            default_preference: Preference::System,
            storage: None,
            watcher: None,
        }
    }

    /// Applies a [`ThemeConfig`]: default preference and, when a settings file
    /// can be located, JSON file storage.
    ///
    /// Storage set with [`storage`](Self::storage) always wins, whichever call
    /// comes first.
    pub fn config(mut self, config: &ThemeConfig) -> Self {
        self.default_preference = config.default_preference;
        if self.storage.is_none() {
            if let Some(storage) = config.file_storage() {
                self.storage = Some(Box::new(storage));
            }
        }
        self
    }

    /// Preference used when storage holds none.
    pub fn default_preference(mut self, preference: Preference) -> Self {
        self.default_preference = preference;
        self
    }

    /// Sets the persistence backend.
    pub fn storage(mut self, storage: impl PreferenceStorage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    /// Sets the host environment watcher.
    pub fn watcher(mut self, watcher: impl SystemPreferenceWatcher + 'static) -> Self {
        self.watcher = Some(Box::new(watcher));
        self
    }

    /// Loads the persisted preference, starts the watcher and returns the store.
    ///
    /// A storage read failure is logged and the default preference is used.
    ///
    /// Without an explicit [`watcher`](Self::watcher) an [`OsWatcher`] is
    /// created here. Its refresher is not reachable afterwards, so such a store
    /// keeps the ambient mode it saw at build time.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::AlreadyStarted`] if the watcher is already running.
    pub fn build(self) -> Result<ThemeStore, ThemeError> {
        let storage: Box<dyn PreferenceStorage> = match self.storage {
            Some(storage) => storage,
            None => Box::new(MemoryStorage::new()),
        };
        let mut watcher: Box<dyn SystemPreferenceWatcher> = match self.watcher {
            Some(watcher) => watcher,
            None => Box::new(OsWatcher::new()),
        };

        let preference = match storage.load() {
            Ok(Some(preference)) => preference,
            Ok(None) => self.default_preference,
            Err(e) => {
                log::warn!(
                    "failed to load theme preference, using '{}': {e}",
                    self.default_preference
                );
                self.default_preference
            }
        };

        // Ambient is a placeholder until the watcher's first report, which
        // arrives synchronously inside `start`.
        let store = ThemeStore {
            inner: Rc::new(Inner {
                state: Cell::new(State::new(preference, ColorMode::Light)),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
                notifying: Cell::new(false),
                pending_ambient: Cell::new(None),
                storage: RefCell::new(storage),
                watcher: RefCell::new(None),
            }),
        };

        let weak = store.downgrade();
        watcher.start(Box::new(move |ambient| {
            if let Some(inner) = weak.upgrade() {
                inner.on_ambient_change(ambient);
            }
        }))?;
        *store.inner.watcher.borrow_mut() = Some(watcher);

        log::info!(
            "theme store initialized (preference: {}, resolved: {})",
            store.preference(),
            store.resolved_theme()
        );
        Ok(store)
    }
}

impl Default for ThemeStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::{AmbientEmitter, ManualWatcher};

    fn store_with(
        preference: Option<Preference>,
        ambient: ColorMode,
    ) -> (ThemeStore, AmbientEmitter, MemoryStorage) {
        let storage = match preference {
            Some(p) => MemoryStorage::with_preference(p),
            None => MemoryStorage::new(),
        };
        let watcher = ManualWatcher::new(ambient);
        let emitter = watcher.emitter();
        let store = ThemeStore::builder()
            .storage(storage.clone())
            .watcher(watcher)
            .build()
            .unwrap();
        (store, emitter, storage)
    }

    fn recording(store: &ThemeStore) -> (Rc<RefCell<Vec<ColorMode>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = store.subscribe(move |mode| sink.borrow_mut().push(mode));
        (seen, sub)
    }

    #[test]
    fn test_defaults_to_system_when_nothing_stored() {
        let (store, _, _) = store_with(None, ColorMode::Dark);
        assert_eq!(store.preference(), Preference::System);
        assert_eq!(store.resolved_theme(), ColorMode::Dark);
    }

    #[test]
    fn test_initializes_from_storage() {
        let (store, _, _) = store_with(Some(Preference::Light), ColorMode::Dark);
        assert_eq!(store.preference(), Preference::Light);
        assert_eq!(store.resolved_theme(), ColorMode::Light);
        assert_eq!(store.ambient(), ColorMode::Dark);
    }

    #[test]
    fn test_set_preference_persists() {
        let (store, _, storage) = store_with(None, ColorMode::Light);
        store.set_preference(Preference::Dark).unwrap();
        assert_eq!(storage.stored(), Some(Preference::Dark));
        assert_eq!(store.preference(), Preference::Dark);
        assert_eq!(store.resolved_theme(), ColorMode::Dark);
    }

    #[test]
    fn test_no_notification_without_resolved_change() {
        let (store, _, storage) = store_with(None, ColorMode::Dark);
        let (seen, _sub) = recording(&store);

        store.set_preference(Preference::Dark).unwrap();
        store.set_preference(Preference::Dark).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(storage.stored(), Some(Preference::Dark));
    }

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let (store, _, _) = store_with(Some(Preference::Light), ColorMode::Light);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let order = Rc::clone(&order);
                store.subscribe(move |_| order.borrow_mut().push(i))
            })
            .collect();

        store.set_preference(Preference::Dark).unwrap();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(subs.len(), 3);
    }

    #[test]
    fn test_ambient_change_ignored_under_manual_preference() {
        let (store, system, _) = store_with(Some(Preference::Light), ColorMode::Light);
        let (seen, _sub) = recording(&store);

        system.emit(ColorMode::Dark);
        assert_eq!(store.resolved_theme(), ColorMode::Light);
        assert_eq!(store.ambient(), ColorMode::Dark);
        assert!(seen.borrow().is_empty());

        store.set_preference(Preference::System).unwrap();
        assert_eq!(store.resolved_theme(), ColorMode::Dark);
        assert_eq!(*seen.borrow(), vec![ColorMode::Dark]);
    }

    #[test]
    fn test_ambient_change_followed_under_system() {
        let (store, system, _) = store_with(None, ColorMode::Light);
        let (seen, _sub) = recording(&store);

        system.emit(ColorMode::Dark);
        assert_eq!(store.resolved_theme(), ColorMode::Dark);
        system.emit(ColorMode::Light);
        assert_eq!(store.resolved_theme(), ColorMode::Light);
        assert_eq!(*seen.borrow(), vec![ColorMode::Dark, ColorMode::Light]);
    }

    #[test]
    fn test_invalid_string_rejected_without_side_effects() {
        let (store, _, storage) = store_with(Some(Preference::Dark), ColorMode::Light);
        let (seen, _sub) = recording(&store);

        let err = store.set_preference_str("purple").unwrap_err();
        assert!(matches!(err, ThemeError::InvalidPreference { .. }));
        assert_eq!(store.preference(), Preference::Dark);
        assert_eq!(storage.stored(), Some(Preference::Dark));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let (store, _, _) = store_with(Some(Preference::Light), ColorMode::Light);
        let (seen, sub) = recording(&store);
        let (_, _other) = recording(&store);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(store.listener_count(), 1);

        store.set_preference(Preference::Dark).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_dropping_subscription_keeps_listener() {
        let (store, _, _) = store_with(Some(Preference::Light), ColorMode::Light);
        let (seen, sub) = recording(&store);
        drop(sub);

        store.set_preference(Preference::Dark).unwrap();
        assert_eq!(*seen.borrow(), vec![ColorMode::Dark]);
    }

    #[test]
    fn test_unsubscribe_from_inside_another_listener() {
        let (store, _, _) = store_with(Some(Preference::Light), ColorMode::Light);
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let handle = Rc::clone(&victim);
        let _killer = store.subscribe(move |_| {
            if let Some(sub) = handle.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        let (seen, sub) = recording(&store);
        *victim.borrow_mut() = Some(sub);

        store.set_preference(Preference::Dark).unwrap();
        store.set_preference(Preference::Light).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_reentrant_set_preference_rejected() {
        let (store, _, storage) = store_with(Some(Preference::Light), ColorMode::Light);
        let result = Rc::new(RefCell::new(None));

        let theme = store.accessor();
        let sink = Rc::clone(&result);
        let _sub = store.subscribe(move |_| {
            *sink.borrow_mut() = Some(theme.set_theme(Preference::Light));
        });

        store.set_preference(Preference::Dark).unwrap();
        assert_eq!(
            *result.borrow(),
            Some(Err(ThemeError::ReentrantMutation))
        );
        assert_eq!(store.preference(), Preference::Dark);
        assert_eq!(storage.stored(), Some(Preference::Dark));

        // The guard is released once the round is over.
        store.set_preference(Preference::Light).unwrap();
        assert_eq!(store.resolved_theme(), ColorMode::Light);
    }

    #[test]
    fn test_ambient_change_during_notification_is_deferred() {
        let (store, _, _) = store_with(None, ColorMode::Light);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_store = store.clone();
        let sink = Rc::clone(&seen);
        let _sub = store.subscribe(move |mode| {
            sink.borrow_mut().push(mode);
            if mode == ColorMode::Dark {
                inner_store.on_ambient_change(ColorMode::Light);
                assert_eq!(inner_store.resolved_theme(), ColorMode::Dark);
            }
        });

        store.on_ambient_change(ColorMode::Dark);
        assert_eq!(*seen.borrow(), vec![ColorMode::Dark, ColorMode::Light]);
        assert_eq!(store.resolved_theme(), ColorMode::Light);
    }

    #[test]
    fn test_ambient_changes_during_notification_keep_latest() {
        let (store, _, _) = store_with(None, ColorMode::Light);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let theme = store.accessor();
        let inner_store = store.clone();
        let sink = Rc::clone(&seen);
        let _sub = store.subscribe(move |mode| {
            sink.borrow_mut().push(mode);
            if mode == ColorMode::Dark && sink.borrow().len() == 1 {
                inner_store.on_ambient_change(ColorMode::Light);
                inner_store.on_ambient_change(ColorMode::Dark);
                assert_eq!(theme.resolved_theme().unwrap(), ColorMode::Dark);
            }
        });

        store.on_ambient_change(ColorMode::Dark);
        // Light was superseded by Dark before the round ended, so the
        // resolved mode never moved and no second round ran.
        assert_eq!(*seen.borrow(), vec![ColorMode::Dark]);
        assert_eq!(store.resolved_theme(), ColorMode::Dark);
        assert_eq!(store.ambient(), ColorMode::Dark);
        store.shutdown();
    }

    #[test]
    fn test_listener_added_mid_round_hears_next_round() {
        let (store, _, _) = store_with(Some(Preference::Light), ColorMode::Light);
        let late = Rc::new(RefCell::new(Vec::new()));
        let late_sub: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let theme = store.accessor();
        let late_sink = Rc::clone(&late);
        let slot = Rc::clone(&late_sub);
        let _sub = store.subscribe(move |_| {
            if slot.borrow().is_none() {
                let sink = Rc::clone(&late_sink);
                let sub = theme
                    .subscribe(move |mode| sink.borrow_mut().push(mode))
                    .unwrap();
                *slot.borrow_mut() = Some(sub);
            }
        });

        store.set_preference(Preference::Dark).unwrap();
        assert!(late.borrow().is_empty());
        assert_eq!(store.listener_count(), 2);

        store.set_preference(Preference::Light).unwrap();
        assert_eq!(*late.borrow(), vec![ColorMode::Light]);
    }

    #[test]
    fn test_accessor_in_listener_does_not_keep_store_alive() {
        let watcher = ManualWatcher::new(ColorMode::Light);
        let emitter = watcher.emitter();
        let store = ThemeStore::builder()
            .storage(MemoryStorage::new())
            .watcher(watcher)
            .build()
            .unwrap();

        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let theme = store.accessor();
        let _sub = store.subscribe(move |_| {
            counter.set(counter.get() + 1);
            let _ = theme.theme();
        });
        drop(store);

        emitter.emit(ColorMode::Dark);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_explicit_storage_survives_config() {
        let storage = MemoryStorage::new();
        let config = ThemeConfig {
            default_preference: Preference::Dark,
            storage_path: Some(std::path::PathBuf::from("/nonexistent/umbra/settings.json")),
            ..ThemeConfig::default()
        };
        let store = ThemeStore::builder()
            .storage(storage.clone())
            .config(&config)
            .watcher(ManualWatcher::new(ColorMode::Light))
            .build()
            .unwrap();

        assert_eq!(store.preference(), Preference::Dark);
        store.set_preference(Preference::Light).unwrap();
        assert_eq!(storage.stored(), Some(Preference::Light));
    }

    #[test]
    fn test_cycle_preference() {
        let (store, _, _) = store_with(Some(Preference::Light), ColorMode::Dark);
        assert_eq!(store.cycle_preference().unwrap(), Preference::Dark);
        assert_eq!(store.cycle_preference().unwrap(), Preference::System);
        assert_eq!(store.resolved_theme(), ColorMode::Dark);
        assert_eq!(store.cycle_preference().unwrap(), Preference::Light);
    }

    #[test]
    fn test_shutdown_stops_watcher() {
        let (store, system, _) = store_with(None, ColorMode::Light);
        store.shutdown();
        store.shutdown();

        system.emit(ColorMode::Dark);
        assert_eq!(store.resolved_theme(), ColorMode::Light);
    }

    #[test]
    fn test_drop_stops_watcher() {
        let watcher = ManualWatcher::new(ColorMode::Light);
        let emitter = watcher.emitter();
        let store = ThemeStore::builder()
            .storage(MemoryStorage::new())
            .watcher(watcher)
            .build()
            .unwrap();
        drop(store);

        // Nothing left to call back into.
        emitter.emit(ColorMode::Dark);
    }

    #[test]
    fn test_started_watcher_rejected() {
        let mut watcher = ManualWatcher::new(ColorMode::Light);
        watcher.start(Box::new(|_| {})).unwrap();
        let result = ThemeStore::builder()
            .storage(MemoryStorage::new())
            .watcher(watcher)
            .build();
        assert!(matches!(result, Err(ThemeError::AlreadyStarted)));
    }

    #[test]
    fn test_clones_share_state() {
        let (store, _, _) = store_with(None, ColorMode::Light);
        let other = store.clone();
        other.set_preference(Preference::Dark).unwrap();
        assert_eq!(store.preference(), Preference::Dark);
        assert!(store.ptr_eq(&other));
    }
}
