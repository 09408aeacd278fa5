//! Fetching channel files and signalling the frontend loop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    repo::{CHANNELS_DIR, PROGRAM_CHANNEL},
};

/// Files published on the data channel.
pub const DATA_FILES: &[&str] = &["games.json", "stats.json", "news.json"];
/// Files published on the program channel.
pub const PROGRAM_FILES: &[&str] = &["version.json"];

/// Events delivered to the frontend loop.
#[derive(Debug)]
pub enum SyncEvent {
    /// Channel content may have changed; the orchestrator should check.
    Ready {
        /// Number of files whose content changed.
        changed: usize,
    },
    /// Fetching failed.
    Error(anyhow::Error),
}

/// Downloads channel files from the configured update URL.
pub struct ChannelSync {
    base_url: String,
    repo_root: PathBuf,
    data_channel: String,
    client: reqwest::Client,
}

impl ChannelSync {
    /// `None` when no update URL is configured.
    pub fn new(config: &AppConfig, repo_root: impl Into<PathBuf>) -> Option<Self> {
        let base_url = config.update_url.as_deref()?.trim_end_matches('/').to_string();
        Some(Self {
            base_url,
            repo_root: repo_root.into(),
            data_channel: config.data_channel.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn channel_dir(&self, channel: &str) -> PathBuf {
        self.repo_root.join(CHANNELS_DIR).join(channel)
    }

    /// Fetch once, sending the result to the provided channel.
    pub async fn run(self, sender: mpsc::Sender<SyncEvent>) -> Result<()> {
        let event = match self.fetch_all().await {
            Ok(changed) => SyncEvent::Ready { changed },
            Err(err) => SyncEvent::Error(err),
        };
        sender
            .send(event)
            .await
            .context("failed to send sync event")?;
        Ok(())
    }

    /// Fetch every channel file, returning how many changed on disk.
    pub async fn fetch_all(&self) -> Result<usize> {
        let mut changed = 0;
        let data_dir = self.channel_dir(&self.data_channel);
        for file in DATA_FILES {
            let url = format!("{}/{}/{}", self.base_url, self.data_channel, file);
            if self.fetch(&url, &data_dir.join(file)).await? {
                changed += 1;
            }
        }
        let program_dir = self.channel_dir(PROGRAM_CHANNEL);
        for file in PROGRAM_FILES {
            let url = format!("{}/{}/{}", self.base_url, PROGRAM_CHANNEL, file);
            if self.fetch(&url, &program_dir.join(file)).await? {
                changed += 1;
            }
        }
        info!(changed, "channel fetch finished");
        Ok(changed)
    }

    async fn fetch(&self, url: &str, target: &Path) -> Result<bool> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request {url}"))?
            .error_for_status()
            .with_context(|| format!("bad response for {url}"))?;
        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;
        write_if_changed(target, &body).await
    }
}

/// Replace `target` with `contents` unless it already holds exactly that.
pub async fn write_if_changed(target: &Path, contents: &[u8]) -> Result<bool> {
    if let Ok(existing) = tokio::fs::read(target).await {
        if existing == contents {
            debug!(path = %target.display(), "unchanged");
            return Ok(false);
        }
    }
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let partial = target.with_extension("part");
    tokio::fs::write(&partial, contents)
        .await
        .with_context(|| format!("failed to write {}", partial.display()))?;
    tokio::fs::rename(&partial, target)
        .await
        .with_context(|| format!("failed to replace {}", target.display()))?;
    Ok(true)
}
