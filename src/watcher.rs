//! Bridges from the host environment's light/dark signal to the theme store.
//!
//! A [`SystemPreferenceWatcher`] pushes the ambient [`ColorMode`] into a
//! callback: once immediately on [`start`](SystemPreferenceWatcher::start),
//! then whenever the host reports a change. Nothing here polls.
//!
//! Two implementations are provided:
//!
//! - [`ManualWatcher`]: the host pushes values through an [`AmbientEmitter`].
//!   Use it when the application already receives a native "appearance
//!   changed" event, and as a fake in tests.
//! - [`OsWatcher`]: reads the OS setting through [`detect_color_mode`] and
//!   re-reads it whenever the host calls [`OsRefresher::refresh`] (for example
//!   on focus gain or a settings-changed message).

use std::cell::RefCell;
use std::rc::Rc;

use crate::detect::detect_color_mode;
use crate::error::ThemeError;
use crate::mode::ColorMode;

/// Receives ambient color mode updates.
pub type AmbientCallback = Box<dyn FnMut(ColorMode)>;

/// Observes the host's ambient light/dark preference.
///
/// Starting is exactly-once: calling [`start`](Self::start) on a running
/// watcher fails with [`ThemeError::AlreadyStarted`]. [`stop`](Self::stop) is
/// idempotent, and a stopped watcher may be started again.
pub trait SystemPreferenceWatcher {
    /// Begins observing. Invokes `callback` with the current ambient value
    /// before returning, then on every later change.
    fn start(&mut self, callback: AmbientCallback) -> Result<(), ThemeError>;

    /// Releases the observation. The callback is dropped and never invoked again.
    fn stop(&mut self);

    /// Whether the watcher is currently observing.
    fn is_started(&self) -> bool;
}

struct Channel {
    current: ColorMode,
    callback: Option<AmbientCallback>,
    started: bool,
    // Bumped on start and stop so a callback taken out for delivery is not
    // put back after the watcher was restarted or stopped underneath it.
    generation: u64,
    delivering: bool,
    pending: Option<ColorMode>,
}

impl Channel {
    fn new(initial: ColorMode) -> Self {
        Self {
            current: initial,
            callback: None,
            started: false,
            generation: 0,
            delivering: false,
            pending: None,
        }
    }
}

fn deliver(channel: &Rc<RefCell<Channel>>, mut mode: ColorMode) {
    loop {
        let (mut callback, generation) = {
            let mut ch = channel.borrow_mut();
            match ch.callback.take() {
                Some(callback) => {
                    ch.delivering = true;
                    (callback, ch.generation)
                }
                None => return,
            }
        };

        callback(mode);

        let mut ch = channel.borrow_mut();
        ch.delivering = false;
        if ch.generation != generation {
            return;
        }
        ch.callback = Some(callback);
        match ch.pending.take() {
            Some(next) => mode = next,
            None => return,
        }
    }
}

/// A watcher fed by the host application.
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use umbra::{ColorMode, ManualWatcher, SystemPreferenceWatcher};
///
/// let mut watcher = ManualWatcher::new(ColorMode::Light);
/// let emitter = watcher.emitter();
///
/// let seen = Rc::new(Cell::new(None));
/// let sink = seen.clone();
/// watcher.start(Box::new(move |mode| sink.set(Some(mode)))).unwrap();
/// assert_eq!(seen.get(), Some(ColorMode::Light));
///
/// emitter.emit(ColorMode::Dark);
/// assert_eq!(seen.get(), Some(ColorMode::Dark));
/// ```
pub struct ManualWatcher {
    channel: Rc<RefCell<Channel>>,
}

impl ManualWatcher {
    /// Creates a watcher whose ambient value starts at `initial`.
    pub fn new(initial: ColorMode) -> Self {
        Self {
            channel: Rc::new(RefCell::new(Channel::new(initial))),
        }
    }

    /// Returns a handle the host uses to report ambient changes.
    pub fn emitter(&self) -> AmbientEmitter {
        AmbientEmitter {
            channel: Rc::clone(&self.channel),
        }
    }
}

impl SystemPreferenceWatcher for ManualWatcher {
    fn start(&mut self, callback: AmbientCallback) -> Result<(), ThemeError> {
        let current = {
            let mut ch = self.channel.borrow_mut();
            if ch.started {
                return Err(ThemeError::AlreadyStarted);
            }
            ch.started = true;
            ch.generation += 1;
            ch.callback = Some(callback);
            ch.pending = None;
            ch.current
        };
        deliver(&self.channel, current);
        Ok(())
    }

    fn stop(&mut self) {
        let mut ch = self.channel.borrow_mut();
        if !ch.started {
            return;
        }
        ch.started = false;
        ch.generation += 1;
        ch.callback = None;
        ch.pending = None;
    }

    fn is_started(&self) -> bool {
        self.channel.borrow().started
    }
}

impl std::fmt::Debug for ManualWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ch = self.channel.borrow();
        f.debug_struct("ManualWatcher")
            .field("current", &ch.current)
            .field("started", &ch.started)
            .finish()
    }
}

/// Host-side handle of a [`ManualWatcher`].
#[derive(Clone)]
pub struct AmbientEmitter {
    channel: Rc<RefCell<Channel>>,
}

impl AmbientEmitter {
    /// Reports the host's ambient mode.
    ///
    /// Repeating the current value does nothing. Values reported while the
    /// watcher is stopped are remembered and delivered on the next start.
    /// Reporting from inside the watcher's own callback is queued and
    /// delivered once that callback returns.
    pub fn emit(&self, mode: ColorMode) {
        {
            let mut ch = self.channel.borrow_mut();
            if ch.current == mode {
                return;
            }
            ch.current = mode;
            if ch.delivering {
                ch.pending = Some(mode);
                return;
            }
        }
        deliver(&self.channel, mode);
    }

    /// The last reported ambient mode.
    pub fn current(&self) -> ColorMode {
        self.channel.borrow().current
    }
}

/// A watcher backed by OS detection.
///
/// The initial value is read on [`start`](SystemPreferenceWatcher::start).
/// Later changes are picked up when the host calls [`OsRefresher::refresh`].
#[derive(Debug)]
pub struct OsWatcher {
    inner: ManualWatcher,
}

impl OsWatcher {
    pub fn new() -> Self {
        Self {
            inner: ManualWatcher::new(detect_color_mode()),
        }
    }

    /// Returns a handle that re-reads the OS setting on demand.
    pub fn refresher(&self) -> OsRefresher {
        OsRefresher {
            emitter: self.inner.emitter(),
        }
    }
}

impl Default for OsWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPreferenceWatcher for OsWatcher {
    fn start(&mut self, callback: AmbientCallback) -> Result<(), ThemeError> {
        if self.inner.is_started() {
            return Err(ThemeError::AlreadyStarted);
        }
        self.inner.emitter().emit(detect_color_mode());
        self.inner.start(callback)
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn is_started(&self) -> bool {
        self.inner.is_started()
    }
}

/// Re-reads the OS color mode for an [`OsWatcher`].
#[derive(Clone)]
pub struct OsRefresher {
    emitter: AmbientEmitter,
}

impl OsRefresher {
    /// Queries the OS and pushes the result if it changed. Returns the value read.
    pub fn refresh(&self) -> ColorMode {
        let mode = detect_color_mode();
        log::debug!("refreshed system color mode: {mode}");
        self.emitter.emit(mode);
        mode
    }
}
