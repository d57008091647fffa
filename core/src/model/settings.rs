use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GOAL: u8 = 75;
pub const DEFAULT_ACCENT: &str = "#007aff";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Zen,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Zen => "zen",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "zen" => Ok(Theme::Zen),
            other => Err(anyhow!("unknown theme: {other}")),
        }
    }
}

/// UI preferences stored alongside the attendance data. The goal percent
/// drives the projection math; theme and accent are cosmetic but travel
/// with exports.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub goal: u8,
    pub theme: Theme,
    pub accent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            goal: DEFAULT_GOAL,
            theme: Theme::default(),
            accent: DEFAULT_ACCENT.to_string(),
        }
    }
}

impl Settings {
    pub fn goal_fraction(&self) -> f64 {
        f64::from(self.goal) / 100.0
    }
}

/// Builds settings from the persisted plain-string values, falling back
/// field by field to defaults on anything unreadable.
pub fn settings_from_strings(
    goal: Option<&str>,
    theme: Option<&str>,
    accent: Option<&str>,
) -> Settings {
    let mut settings = Settings::default();
    if let Some(goal) = goal {
        match goal.trim().parse::<u8>() {
            Ok(value) if (1..=100).contains(&value) => settings.goal = value,
            _ => log::warn!("ignoring invalid attendance goal {goal:?}"),
        }
    }
    if let Some(theme) = theme {
        match theme.trim().parse::<Theme>() {
            Ok(value) => settings.theme = value,
            Err(_) => log::warn!("ignoring invalid theme {theme:?}"),
        }
    }
    if let Some(accent) = accent {
        let accent = accent.trim();
        if is_hex_color(accent) {
            settings.accent = accent.to_string();
        } else {
            log::warn!("ignoring invalid accent color {accent:?}");
        }
    }
    settings
}

/// Accepts `#rrggbb` only.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_round_trips_through_str() {
        for theme in [Theme::Light, Theme::Dark, Theme::Zen] {
            assert_eq!(theme.as_str().parse::<Theme>().unwrap(), theme);
        }
        assert!("solarized".parse::<Theme>().is_err());
    }

    #[test]
    fn bad_setting_strings_fall_back_individually() {
        let settings = settings_from_strings(Some("0"), Some("dark"), Some("blue"));
        assert_eq!(settings.goal, DEFAULT_GOAL);
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.accent, DEFAULT_ACCENT);

        let settings = settings_from_strings(Some("85"), None, Some("#ff2d55"));
        assert_eq!(settings.goal, 85);
        assert_eq!(settings.accent, "#ff2d55");
    }

    #[test]
    fn hex_color_validation() {
        assert!(is_hex_color("#007aff"));
        assert!(is_hex_color("#FFCC00"));
        assert!(!is_hex_color("007aff"));
        assert!(!is_hex_color("#07aff"));
        assert!(!is_hex_color("#zzzzzz"));
    }
}
