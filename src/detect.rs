//! Color mode detection from the operating system.
//!
//! [`detect_color_mode`] queries the OS for the user's preferred scheme using
//! the `dark-light` crate. Override it for testing, or to plug in a different
//! source such as a terminal background probe, with [`set_theme_detector`]:
//!
//! ```rust
//! use umbra::{detect_color_mode, reset_theme_detector, set_theme_detector, ColorMode};
//!
//! set_theme_detector(|| ColorMode::Dark);
//! assert_eq!(detect_color_mode(), ColorMode::Dark);
//!
//! reset_theme_detector();
//! ```

use dark_light::{detect as detect_os_theme, Mode as OsThemeMode};
use once_cell::sync::Lazy;
use std::sync::Mutex;

use crate::mode::ColorMode;

/// A function returning the host's current color mode.
pub type ThemeDetector = fn() -> ColorMode;

static THEME_DETECTOR: Lazy<Mutex<ThemeDetector>> = Lazy::new(|| Mutex::new(os_theme_detector));

/// Overrides the detector used to determine whether the host prefers a light or dark theme.
pub fn set_theme_detector(detector: ThemeDetector) {
    let mut guard = THEME_DETECTOR.lock().unwrap_or_else(|e| e.into_inner());
    *guard = detector;
}

/// Restores OS detection after [`set_theme_detector`].
pub fn reset_theme_detector() {
    set_theme_detector(os_theme_detector);
}

/// Detects the host's current color mode.
///
/// # Returns
///
/// - [`ColorMode::Light`] if the OS is in light mode
/// - [`ColorMode::Dark`] if the OS is in dark mode
pub fn detect_color_mode() -> ColorMode {
    let detector = *THEME_DETECTOR.lock().unwrap_or_else(|e| e.into_inner());
    detector()
}

fn os_theme_detector() -> ColorMode {
    match detect_os_theme() {
        OsThemeMode::Dark => ColorMode::Dark,
        OsThemeMode::Light => ColorMode::Light,
    }
}
