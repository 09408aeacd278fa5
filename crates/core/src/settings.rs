//! Per-repository launcher preferences (`launcher.json`).

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// File name inside the repository root.
pub const SETTINGS_FILE: &str = "launcher.json";

/// Preferences stored alongside the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RepoSettings {
    /// Games added after this unix time are flagged as new.
    #[serde(default)]
    pub last_seen: i64,
    /// Show ratings next to titles.
    #[serde(default)]
    pub show_votes: bool,
}

impl RepoSettings {
    /// Load settings, falling back to defaults when missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        let parsed = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from));
        match parsed {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), "using default launcher settings: {err}");
                Self::default()
            }
        }
    }

    /// Write the settings to `path`.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))
    }
}
