use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::storage::KeyValueStore;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

/// Persisted user preferences. Loaded at startup, written on every change.
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    theme: Theme,
}

impl Preferences {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let theme = match store.read(THEME_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Theme>(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable theme preference: {}", e);
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(e) => {
                tracing::warn!("Failed to load theme preference: {}", e);
                Theme::default()
            }
        };
        Self { store, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        let raw = serde_json::to_string(&theme).unwrap_or_else(|_| format!("\"{theme}\""));
        if let Err(e) = self.store.write(THEME_KEY, &raw) {
            tracing::warn!("Failed to save theme preference: {}", e);
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let next = self.theme.toggled();
        self.set_theme(next);
        next
    }
}
