use crate::store::{KeyValueStore, StoreError, THEME_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Glyph shown on the toggle control.
    pub fn icon(self) -> &'static str {
        match self {
            Theme::Dark => "🌙",
            Theme::Light => "☀️",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme {other:?} (expected dark or light)")),
        }
    }
}

/// Display preferences shared by both surfaces.
pub struct PreferencesManager<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> PreferencesManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn theme(&self) -> Theme {
        self.store.get(THEME_KEY).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.store.set(THEME_KEY, &theme)
    }

    pub fn toggle_theme(&self) -> Result<Theme, StoreError> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}
