//! Shared domain models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Catalogue entry describing a single game, as published in the data channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    /// Stable identifier (e.g. `tiggit-tetris`), used to key everything else.
    pub id: String,
    /// Human-readable game title.
    pub title: String,
    /// Optional one-line description.
    #[serde(default)]
    pub tagline: Option<String>,
    /// Free-form category tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the entry is a demo of a commercial game.
    #[serde(default)]
    pub is_demo: bool,
    /// Unix timestamp of when the game was added to the catalogue.
    #[serde(default)]
    pub added: i64,
    /// Link to the game's homepage, if any.
    #[serde(default)]
    pub homepage: Option<String>,
}

impl GameInfo {
    /// Returns a user-facing label combining title and tagline.
    pub fn display_name(&self) -> String {
        match self.tagline.as_deref() {
            Some(tagline) if !tagline.is_empty() => format!("{} · {}", self.title, tagline),
            _ => self.title.clone(),
        }
    }
}

/// Local install state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    /// Nothing on disk.
    #[default]
    NotInstalled,
    /// A download or install job is running.
    Downloading,
    /// Ready to play.
    Installed,
}

/// Download statistics published alongside the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GameStats {
    /// Total number of downloads.
    #[serde(default)]
    pub downloads: u64,
    /// Average user rating, when enough votes exist.
    #[serde(default)]
    pub rating: Option<f32>,
}

/// Live, repository-owned record for one game in the current load generation.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveInfo {
    /// Catalogue data.
    pub info: GameInfo,
    /// Local install state.
    pub status: InstallStatus,
    /// Latest known statistics.
    pub stats: GameStats,
    /// Load generation of the repository that produced this record.
    pub generation: u64,
}

impl LiveInfo {
    /// Build a fresh record for the given generation.
    pub fn new(info: GameInfo, status: InstallStatus, generation: u64) -> Self {
        Self {
            info,
            status,
            stats: GameStats::default(),
            generation,
        }
    }

    /// Stable game identifier.
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// True when nothing of the game exists locally.
    pub fn is_uninstalled(&self) -> bool {
        self.status == InstallStatus::NotInstalled
    }
}

/// Identifier-keyed lookup of all live records.
pub type InfoLookup = BTreeMap<String, LiveInfo>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_status_uses_lowercase_names() -> anyhow::Result<()> {
        let status: InstallStatus = serde_json::from_str("\"downloading\"")?;
        assert_eq!(status, InstallStatus::Downloading);
        assert_eq!(serde_json::to_string(&InstallStatus::Installed)?, "\"installed\"");
        Ok(())
    }

    #[test]
    fn only_not_installed_counts_as_uninstalled() {
        let info = GameInfo {
            id: "a".to_string(),
            title: "A".to_string(),
            tagline: None,
            tags: Vec::new(),
            is_demo: false,
            added: 0,
            homepage: None,
        };
        let mut live = LiveInfo::new(info, InstallStatus::NotInstalled, 1);
        assert!(live.is_uninstalled());
        live.status = InstallStatus::Downloading;
        assert!(!live.is_uninstalled());
        live.status = InstallStatus::Installed;
        assert!(!live.is_uninstalled());
    }
}
