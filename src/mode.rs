//! Theme preference and color mode values.
//!
//! A [`Preference`] is what the user picked. A [`ColorMode`] is what actually
//! gets applied. The two meet in [`Preference::resolve`]: concrete preferences
//! map to themselves, [`Preference::System`] follows the host's ambient mode.
//!
//! ```rust
//! use umbra::{ColorMode, Preference};
//!
//! assert_eq!(Preference::System.resolve(ColorMode::Dark), ColorMode::Dark);
//! assert_eq!(Preference::Light.resolve(ColorMode::Dark), ColorMode::Light);
//!
//! let pref: Preference = "dark".parse().unwrap();
//! assert_eq!(pref, Preference::Dark);
//! assert!("purple".parse::<Preference>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;

/// A concrete light or dark display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Light mode (light background, dark text).
    Light,
    /// Dark mode (dark background, light text).
    Dark,
}

/// The concrete mode applied to the UI.
pub type ResolvedTheme = ColorMode;

/// The host environment's current light/dark signal.
pub type AmbientSystemTheme = ColorMode;

impl ColorMode {
    /// Returns `true` for [`ColorMode::Dark`].
    pub fn is_dark(self) -> bool {
        matches!(self, ColorMode::Dark)
    }

    /// Returns the opposite mode.
    pub fn toggled(self) -> Self {
        match self {
            ColorMode::Light => ColorMode::Dark,
            ColorMode::Dark => ColorMode::Light,
        }
    }

    /// Picks the variant matching this mode.
    ///
    /// This is how consumers choose visuals from the resolved theme:
    ///
    /// ```rust
    /// use umbra::ColorMode;
    ///
    /// let border = ColorMode::Dark.select("zinc-200", "zinc-800");
    /// assert_eq!(border, "zinc-800");
    /// ```
    pub fn select<T>(self, light: T, dark: T) -> T {
        match self {
            ColorMode::Light => light,
            ColorMode::Dark => dark,
        }
    }

    /// The lowercase name used in storage and output.
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Light => "light",
            ColorMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's theme choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    /// Always light.
    Light,
    /// Always dark.
    Dark,
    /// Follow the host environment.
    #[default]
    System,
}

impl Preference {
    /// Every preference, in toggle order.
    pub const ALL: [Preference; 3] = [Preference::Light, Preference::Dark, Preference::System];

    /// Resolves this preference against the ambient system mode.
    pub fn resolve(self, ambient: ColorMode) -> ColorMode {
        match self {
            Preference::Light => ColorMode::Light,
            Preference::Dark => ColorMode::Dark,
            Preference::System => ambient,
        }
    }

    /// The next preference in the toggle cycle: light, dark, system, light...
    pub fn next(self) -> Self {
        match self {
            Preference::Light => Preference::Dark,
            Preference::Dark => Preference::System,
            Preference::System => Preference::Light,
        }
    }

    /// Returns `true` for [`Preference::System`].
    pub fn follows_system(self) -> bool {
        matches!(self, Preference::System)
    }

    /// The lowercase name used in storage and output.
    pub fn as_str(self) -> &'static str {
        match self {
            Preference::Light => "light",
            Preference::Dark => "dark",
            Preference::System => "system",
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preference {
    type Err = ThemeError;

    /// Parses `light`, `dark` or `system`, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Preference::Light),
            "dark" => Ok(Preference::Dark),
            "system" => Ok(Preference::System),
            _ => Err(ThemeError::InvalidPreference {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<&str> for Preference {
    type Error = ThemeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColorMode> for Preference {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Light => Preference::Light,
            ColorMode::Dark => Preference::Dark,
        }
    }
}
