//! Repository news feed and its display projection.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single entry of the news feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Publication time, unix seconds.
    pub date: i64,
    /// Headline.
    pub subject: String,
    /// Body text.
    pub body: String,
    /// Whether the user has seen this entry.
    pub is_read: bool,
}

#[derive(Debug, Deserialize)]
struct RawNewsItem {
    date: i64,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

/// Identity of a news item in the read-state file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct ReadKey {
    date: i64,
    subject: String,
}

impl ReadKey {
    fn of(item: &NewsItem) -> Self {
        Self {
            date: item.date,
            subject: item.subject.clone(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReadState {
    #[serde(default)]
    read: BTreeSet<ReadKey>,
}

/// News store backed by the channel's `news.json` and a local read-state file.
///
/// Read flags are keyed by date and subject, so a refreshed feed keeps the
/// flags of entries the user already saw. Writing the state merges with what
/// is on disk; flags are never dropped.
#[derive(Debug)]
pub struct NewsFeed {
    feed_path: PathBuf,
    state_path: PathBuf,
    items: Vec<NewsItem>,
}

impl NewsFeed {
    /// Create an empty store; call [`NewsFeed::reload`] to populate it.
    pub fn new(feed_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            feed_path: feed_path.into(),
            state_path: state_path.into(),
            items: Vec::new(),
        }
    }

    /// Re-read both the feed and the read state from disk.
    pub fn reload(&mut self) -> Result<()> {
        let read = load_read_state(&self.state_path)?;
        let raw = load_feed(&self.feed_path)?;
        self.items = raw
            .into_iter()
            .map(|item| {
                let mut item = NewsItem {
                    date: item.date,
                    subject: item.subject,
                    body: item.body,
                    is_read: false,
                };
                item.is_read = read.contains(&ReadKey::of(&item));
                item
            })
            .collect();
        Ok(())
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the feed has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`.
    pub fn get(&self, index: usize) -> Option<&NewsItem> {
        self.items.get(index)
    }

    /// All items in feed order.
    pub fn items(&self) -> &[NewsItem] {
        &self.items
    }

    /// Mark one item as read and persist the flag.
    ///
    /// Returns `false` when `index` is out of range. On a write failure the
    /// item is left unread.
    pub fn mark_as_read(&mut self, index: usize) -> Result<bool> {
        let Some(item) = self.items.get(index) else {
            return Ok(false);
        };
        self.persist([ReadKey::of(item)])?;
        self.items[index].is_read = true;
        Ok(true)
    }

    /// Mark every item as read and persist the flags.
    ///
    /// Nothing changes in memory when the write fails.
    pub fn mark_all_as_read(&mut self) -> Result<()> {
        let keys: Vec<ReadKey> = self.items.iter().map(ReadKey::of).collect();
        self.persist(keys)?;
        for item in &mut self.items {
            item.is_read = true;
        }
        Ok(())
    }

    fn persist(&self, keys: impl IntoIterator<Item = ReadKey>) -> Result<()> {
        let mut state = ReadState {
            read: load_read_state(&self.state_path)?,
        };
        state.read.extend(keys);

        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_vec_pretty(&state)?;
        fs::write(&self.state_path, serialized)
            .with_context(|| format!("failed to write {}", self.state_path.display()))
    }
}

fn load_feed(path: &Path) -> Result<Vec<RawNewsItem>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_read_state(path: &Path) -> Result<BTreeSet<ReadKey>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    match serde_json::from_str::<ReadState>(&content) {
        Ok(state) => Ok(state.read),
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable news state: {err}");
            Ok(BTreeSet::new())
        }
    }
}

/// Display-ready projection of a [`NewsItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsDisplayItem {
    /// Mirrors [`NewsItem::is_read`].
    pub read: bool,
    /// Raw timestamp, for sorting.
    pub date_num: i64,
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    /// Headline.
    pub subject: String,
    /// Body text.
    pub body: String,
}

/// Keeps a display list in lockstep with a [`NewsFeed`].
#[derive(Debug)]
pub struct GameNews {
    news: NewsFeed,
    items: Vec<NewsDisplayItem>,
}

impl GameNews {
    /// Wrap a store. The display list stays empty until the first reload.
    pub fn new(news: NewsFeed) -> Self {
        Self {
            news,
            items: Vec::new(),
        }
    }

    /// Reload the underlying feed and rebuild every display record.
    pub fn reload(&mut self) -> Result<()> {
        self.news.reload()?;
        self.items = self
            .news
            .items()
            .iter()
            .map(|item| NewsDisplayItem {
                read: item.is_read,
                date_num: item.date,
                date: format_date(item.date),
                subject: item.subject.clone(),
                body: item.body.clone(),
            })
            .collect();
        Ok(())
    }

    /// Display records in feed order.
    pub fn items(&self) -> &[NewsDisplayItem] {
        &self.items
    }

    /// Number of display records not yet read.
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    /// Mark one item read in the store, then in the display list.
    ///
    /// Returns `false` when `index` is out of range.
    pub fn mark_as_read(&mut self, index: usize) -> Result<bool> {
        if index >= self.items.len() || !self.news.mark_as_read(index)? {
            return Ok(false);
        }
        self.items[index].read = true;
        Ok(true)
    }

    /// Mark everything read in the store, then in the display list.
    pub fn mark_all_as_read(&mut self) -> Result<()> {
        self.news.mark_all_as_read()?;
        for item in &mut self.items {
            item.read = true;
        }
        Ok(())
    }
}

/// Format a unix timestamp as a UTC calendar date.
pub fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
