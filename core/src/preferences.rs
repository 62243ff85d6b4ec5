use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::legacy::KeyValueStore;
use crate::validation::ValidationError;

pub const THEME_KEY: &str = "fitlog-theme";
pub const LANGUAGE_KEY: &str = "fitlog-language";

pub const SUPPORTED_LANGUAGES: [&str; 7] = ["en", "hi", "kn", "ta", "te", "fr", "de"];
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

/// A concrete theme after `System` has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl ThemeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    #[must_use]
    pub fn resolve(self, system_prefers_dark: bool) -> Theme {
        match self {
            ThemeMode::Light => Theme::Light,
            ThemeMode::Dark => Theme::Dark,
            ThemeMode::System if system_prefers_dark => Theme::Dark,
            ThemeMode::System => Theme::Light,
        }
    }

    /// The explicit mode opposite to what is currently shown.
    #[must_use]
    pub fn toggle(self, system_prefers_dark: bool) -> ThemeMode {
        match self.resolve(system_prefers_dark) {
            Theme::Light => ThemeMode::Dark,
            Theme::Dark => ThemeMode::Light,
        }
    }

    /// light -> dark -> system -> light
    #[must_use]
    pub fn cycle(self) -> ThemeMode {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::System,
            ThemeMode::System => ThemeMode::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            _ => Err(ValidationError::UnsupportedValue {
                kind: "theme",
                value: s.to_string(),
                allowed: "light, dark, system".to_string(),
            }),
        }
    }
}

pub fn ensure_supported_language(code: &str) -> Result<&'static str, ValidationError> {
    let lower = code.to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|&&l| l == lower)
        .copied()
        .ok_or_else(|| ValidationError::UnsupportedValue {
            kind: "language",
            value: code.to_string(),
            allowed: SUPPORTED_LANGUAGES.join(", "),
        })
}

/// Theme and language choices persisted in the key/value store.
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored theme, or `System` when missing or unrecognized.
    #[must_use]
    pub fn theme(&self) -> ThemeMode {
        match self.store.get(THEME_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| {
                debug!(value = %raw, "ignoring unknown stored theme");
                ThemeMode::System
            }),
            Ok(None) => ThemeMode::System,
            Err(e) => {
                warn!(error = %e, "could not read theme preference");
                ThemeMode::System
            }
        }
    }

    pub fn set_theme(&self, mode: ThemeMode) -> Result<()> {
        self.store.set(THEME_KEY, mode.as_str())
    }

    pub fn cycle_theme(&self) -> Result<ThemeMode> {
        let next = self.theme().cycle();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn toggle_theme(&self, system_prefers_dark: bool) -> Result<ThemeMode> {
        let next = self.theme().toggle(system_prefers_dark);
        self.set_theme(next)?;
        Ok(next)
    }

    /// Stored language, or `en` when missing or unsupported.
    #[must_use]
    pub fn language(&self) -> &'static str {
        match self.store.get(LANGUAGE_KEY) {
            Ok(Some(raw)) => ensure_supported_language(&raw).unwrap_or(DEFAULT_LANGUAGE),
            Ok(None) => DEFAULT_LANGUAGE,
            Err(e) => {
                warn!(error = %e, "could not read language preference");
                DEFAULT_LANGUAGE
            }
        }
    }

    pub fn set_language(&self, code: &str) -> Result<&'static str> {
        let code = ensure_supported_language(code)?;
        self.store.set(LANGUAGE_KEY, code)?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::MemoryStore;

    fn prefs() -> (Preferences, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Preferences::new(store.clone()), store)
    }

    #[test]
    fn test_theme_defaults_to_system() {
        let (prefs, store) = prefs();
        assert_eq!(prefs.theme(), ThemeMode::System);
        store.set(THEME_KEY, "purple").unwrap();
        assert_eq!(prefs.theme(), ThemeMode::System);
    }

    #[test]
    fn test_theme_cycle_order() {
        let (prefs, _) = prefs();
        prefs.set_theme(ThemeMode::Light).unwrap();
        assert_eq!(prefs.cycle_theme().unwrap(), ThemeMode::Dark);
        assert_eq!(prefs.cycle_theme().unwrap(), ThemeMode::System);
        assert_eq!(prefs.cycle_theme().unwrap(), ThemeMode::Light);
        assert_eq!(prefs.theme(), ThemeMode::Light);
    }

    #[test]
    fn test_toggle_flips_resolved_theme() {
        assert_eq!(ThemeMode::System.toggle(true), ThemeMode::Light);
        assert_eq!(ThemeMode::System.toggle(false), ThemeMode::Dark);
        assert_eq!(ThemeMode::Dark.toggle(false), ThemeMode::Light);

        let (prefs, store) = prefs();
        prefs.toggle_theme(true).unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(ThemeMode::System.resolve(true), Theme::Dark);
        assert_eq!(ThemeMode::Light.resolve(true), Theme::Light);
    }

    #[test]
    fn test_language_roundtrip_and_validation() {
        let (prefs, store) = prefs();
        assert_eq!(prefs.language(), "en");
        assert_eq!(prefs.set_language("KN").unwrap(), "kn");
        assert_eq!(prefs.language(), "kn");

        assert!(matches!(
            prefs.set_language("xx"),
            Err(e) if e.downcast_ref::<ValidationError>().is_some()
        ));
        store.set(LANGUAGE_KEY, "zz").unwrap();
        assert_eq!(prefs.language(), "en");
    }
}
