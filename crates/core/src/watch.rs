//! Watching channel directories for content written by other processes.

use std::path::Path;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::sync::SyncEvent;

/// Sends [`SyncEvent::Ready`] whenever something under the watched directory changes.
///
/// Watching stops when the value is dropped.
pub struct ChannelWatcher {
    _watcher: RecommendedWatcher,
}

impl ChannelWatcher {
    /// Watch `channels_dir` recursively, creating it first if needed.
    pub fn spawn(channels_dir: &Path, sender: mpsc::Sender<SyncEvent>) -> Result<Self> {
        std::fs::create_dir_all(channels_dir)
            .with_context(|| format!("failed to create {}", channels_dir.display()))?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if is_content_change(&event.kind) => {
                    debug!(paths = ?event.paths, "channel content changed");
                    // A full queue already holds a pending check.
                    let _ = sender.try_send(SyncEvent::Ready { changed: event.paths.len() });
                }
                Ok(_) => {}
                Err(err) => warn!("channel watcher error: {err}"),
            }
        })
        .context("failed to create channel watcher")?;

        watcher
            .watch(channels_dir, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", channels_dir.display()))?;

        Ok(Self { _watcher: watcher })
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
