//! The data repository: catalogue, install state and statistics on disk.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    config::{PathStore, DEFAULT_CHANNEL},
    models::{GameInfo, GameStats, InfoLookup, InstallStatus, LiveInfo},
    news::NewsFeed,
    spread::{FsSync, SyncEngine},
};

/// Executables directory inside a repository.
pub const RUN_DIR: &str = "run";
/// Channel data, relative to the repository root.
pub const CHANNELS_DIR: &str = "spread/channels";
/// Sync engine cache configuration, relative to the repository root.
pub const CACHE_CONF: &str = "spread/cache.conf";
/// Program channel carrying the version manifest.
pub const PROGRAM_CHANNEL: &str = "tiggit";
/// Local install state file.
pub const INSTALLED_FILE: &str = "installed.json";
/// Local news read-state file.
pub const NEWS_STATE_FILE: &str = "read_news.json";

/// Access to the launcher's data repository.
pub trait Repository {
    /// True when the channel holds data newer than what was last loaded.
    fn has_new_data(&self) -> bool;
    /// Refresh statistics on the currently loaded records.
    fn load_stats(&mut self) -> Result<()>;
    /// Replace every live record with freshly loaded data.
    fn load_data(&mut self) -> Result<()>;
    /// Signal that launcher-side state for the new records is in place.
    fn done_loading(&mut self);
    /// All live records keyed by game id.
    fn list(&self) -> &InfoLookup;
    /// Live records in catalogue order.
    fn base_list(&self) -> Vec<&LiveInfo>;
    /// Repository root.
    fn path(&self) -> &Path;
    /// Path of `suffix` inside the repository.
    fn path_to(&self, suffix: &str) -> PathBuf {
        self.path().join(suffix)
    }
    /// Persist `path` as the repository location for future launches.
    fn set_stored_path(&mut self, path: &Path) -> Result<()>;
    /// Engine used to move repository content.
    fn sync_engine(&self) -> &dyn SyncEngine;
    /// News store for this repository.
    fn news_feed(&self) -> NewsFeed;
    /// Number of completed [`Repository::load_data`] calls.
    fn generation(&self) -> u64;
    /// Whether [`Repository::done_loading`] was called for the current generation.
    fn is_loaded(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let metadata = fs::metadata(path).ok()?;
    Some(Fingerprint {
        len: metadata.len(),
        modified: metadata.modified().ok(),
    })
}

/// Filesystem-backed [`Repository`].
pub struct LocalRepo {
    root: PathBuf,
    channel: String,
    store: PathStore,
    engine: FsSync,
    list: InfoLookup,
    order: Vec<String>,
    generation: u64,
    loaded: bool,
    loaded_fingerprint: Option<Fingerprint>,
}

impl LocalRepo {
    /// Open a repository rooted at `root` using the default data channel.
    pub fn new(root: impl Into<PathBuf>, store: PathStore) -> Self {
        Self::with_channel(root, DEFAULT_CHANNEL, store)
    }

    /// Open a repository reading its catalogue from the named data channel.
    pub fn with_channel(root: impl Into<PathBuf>, channel: &str, store: PathStore) -> Self {
        Self {
            root: root.into(),
            channel: channel.to_string(),
            store,
            engine: FsSync,
            list: InfoLookup::new(),
            order: Vec::new(),
            generation: 0,
            loaded: false,
            loaded_fingerprint: None,
        }
    }

    /// Directory of the data channel.
    pub fn channel_dir(&self) -> PathBuf {
        self.root.join(CHANNELS_DIR).join(&self.channel)
    }

    /// Catalogue file.
    pub fn games_file(&self) -> PathBuf {
        self.channel_dir().join("games.json")
    }

    /// Download statistics file.
    pub fn stats_file(&self) -> PathBuf {
        self.channel_dir().join("stats.json")
    }

    /// News feed file.
    pub fn news_file(&self) -> PathBuf {
        self.channel_dir().join("news.json")
    }

    /// Version manifest published on the program channel.
    pub fn version_file(&self) -> PathBuf {
        self.root
            .join(CHANNELS_DIR)
            .join(PROGRAM_CHANNEL)
            .join("version.json")
    }

    fn read_stats(&self) -> Result<HashMap<String, GameStats>> {
        read_optional_json(&self.stats_file())
    }
}

impl Repository for LocalRepo {
    fn has_new_data(&self) -> bool {
        match fingerprint(&self.games_file()) {
            Some(current) => self.loaded_fingerprint != Some(current),
            None => false,
        }
    }

    fn load_stats(&mut self) -> Result<()> {
        let stats = self.read_stats()?;
        for (id, info) in self.list.iter_mut() {
            info.stats = stats.get(id).copied().unwrap_or_default();
        }
        debug!(entries = stats.len(), "statistics refreshed");
        Ok(())
    }

    fn load_data(&mut self) -> Result<()> {
        let games_file = self.games_file();
        let fingerprint_before = fingerprint(&games_file);
        let games: Vec<GameInfo> = read_optional_json(&games_file)?;
        let installed: HashMap<String, InstallStatus> =
            read_optional_json(&self.root.join(INSTALLED_FILE))?;
        let stats = self.read_stats()?;

        let generation = self.generation + 1;
        let mut list = InfoLookup::new();
        let mut order = Vec::with_capacity(games.len());
        for game in games {
            let id = game.id.clone();
            if list.contains_key(&id) {
                warn!(game_id = %id, "duplicate catalogue entry skipped");
                continue;
            }
            let status = installed.get(&id).copied().unwrap_or_default();
            let mut live = LiveInfo::new(game, status, generation);
            live.stats = stats.get(&id).copied().unwrap_or_default();
            order.push(id.clone());
            list.insert(id, live);
        }

        self.list = list;
        self.order = order;
        self.generation = generation;
        self.loaded = false;
        self.loaded_fingerprint = fingerprint_before;
        info!(generation, games = self.order.len(), "repository data loaded");
        Ok(())
    }

    fn done_loading(&mut self) {
        self.loaded = true;
        debug!(generation = self.generation, "repository loading complete");
    }

    fn list(&self) -> &InfoLookup {
        &self.list
    }

    fn base_list(&self) -> Vec<&LiveInfo> {
        self.order
            .iter()
            .filter_map(|id| self.list.get(id))
            .collect()
    }

    fn path(&self) -> &Path {
        &self.root
    }

    fn set_stored_path(&mut self, path: &Path) -> Result<()> {
        self.store.store(path)
    }

    fn sync_engine(&self) -> &dyn SyncEngine {
        &self.engine
    }

    fn news_feed(&self) -> NewsFeed {
        NewsFeed::new(self.news_file(), self.root.join(NEWS_STATE_FILE))
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }
}

fn read_optional_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
