//! Persisted light/dark colour scheme.

use tracing::warn;

use crate::error::StorageResult;
use crate::storage::{KeyValueStore, THEME_KEY};

// ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        // Tolerate a JSON-quoted value as well as the bare word.
        match raw.trim().trim_matches('"') {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Stored mode, or the default when absent, unknown or unreadable.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        // ---
        match store.get(THEME_KEY) {
            Ok(Some(raw)) => Self::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Ignoring unknown theme mode");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "Could not read theme mode");
                Self::default()
            }
        }
    }

    pub fn save(self, store: &dyn KeyValueStore) -> StorageResult<()> {
        store.set(THEME_KEY, self.as_str())
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
