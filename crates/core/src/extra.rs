//! Launcher-side per-game records attached to the repository's live list.
//!
//! Records are keyed by game id and stamped with the load generation of the
//! [`LiveInfo`] they were built from. The store is emptied before every
//! repository reload and refilled afterwards, so a record never outlives the
//! data it decorates.

use std::collections::HashMap;

use crate::{
    models::{InstallStatus, LiveInfo},
    news::format_date,
    settings::RepoSettings,
};

/// Display state for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameInf {
    /// Game id of the live record.
    pub id: String,
    /// Generation of the live record this was built from.
    pub generation: u64,
    /// Title shown in lists.
    pub title: String,
    /// Date the game was added, `YYYY-MM-DD`.
    pub added: String,
    /// Added since the user last looked at the catalogue.
    pub is_new: bool,
    /// Install state label, empty when nothing is on disk.
    pub status: String,
    /// Average rating, hidden unless votes are shown.
    pub rating: Option<f32>,
    /// Download count from the statistics file.
    pub downloads: u64,
}

impl GameInf {
    /// Build the record for `info` under the current settings.
    pub fn new(info: &LiveInfo, settings: &RepoSettings) -> Self {
        let mut inf = Self {
            id: info.id().to_string(),
            generation: info.generation,
            title: info.info.display_name(),
            added: format_date(info.info.added),
            is_new: info.info.added > settings.last_seen,
            status: String::new(),
            rating: None,
            downloads: 0,
        };
        inf.refresh_status(info, settings);
        inf
    }

    /// Re-derive the fields that change without a reload.
    pub fn refresh_status(&mut self, info: &LiveInfo, settings: &RepoSettings) {
        self.status = match info.status {
            InstallStatus::NotInstalled => String::new(),
            InstallStatus::Downloading => "downloading".to_string(),
            InstallStatus::Installed => "installed".to_string(),
        };
        self.rating = if settings.show_votes {
            info.stats.rating
        } else {
            None
        };
        self.downloads = info.stats.downloads;
    }
}

/// Exclusively-owned extension records for one load generation.
#[derive(Debug)]
pub struct ExtraStore<T> {
    records: HashMap<String, T>,
}

impl<T> Default for ExtraStore<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<T> ExtraStore<T> {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a record for `id`. Returns the record it replaced, which means
    /// the store was not cleared before a reload.
    pub fn attach(&mut self, id: impl Into<String>, record: T) -> Option<T> {
        self.records.insert(id.into(), record)
    }

    /// Record for `id`.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.get(id)
    }

    /// Mutable record for `id`.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.records.get_mut(id)
    }

    /// Destroy every record. Returns how many were released.
    pub fn clear(&mut self) -> usize {
        let released = self.records.len();
        self.records.clear();
        released
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True after a clear and before the next reload fills the store.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.records.iter()
    }

    /// Mutable records in arbitrary order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut T)> {
        self.records.iter_mut()
    }
}
