//! Shared display settings broadcast to every render surface.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::error::{Error, Result};

/// Color theme applied across all sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Solarized,
    HighContrast,
}

impl Theme {
    /// Stable name for configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Solarized => "solarized",
            Theme::HighContrast => "high-contrast",
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "solarized" => Ok(Theme::Solarized),
            "high-contrast" => Ok(Theme::HighContrast),
            other => Err(Error::Protocol {
                message: format!("unknown theme: {}", other),
            }),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display settings shared by every session's render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub theme: Theme,
    pub font_size: u8,
}

impl DisplaySettings {
    /// Create settings with the font size clamped to the allowed range.
    pub fn new(theme: Theme, font_size: u8) -> Self {
        Self {
            theme,
            font_size: font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
        }
    }

    /// Return a copy with the font size clamped to the allowed range.
    pub fn clamped(self) -> Self {
        Self::new(self.theme, self.font_size)
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}
