//! Marker left in a relocated repository pointing back at the old location.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name of the marker inside the new repository.
pub const CLEANUP_FILE: &str = "cleanup.json";

/// Records a stale repository the user may want to delete after a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupMarker {
    /// Repository location before the move.
    pub old_repo: PathBuf,
    /// Ask the user interactively before deleting anything.
    pub ask_delete: bool,
}

impl CleanupMarker {
    /// Marker pointing at `old_repo`, asking the user before deleting it.
    pub fn new(old_repo: impl Into<PathBuf>) -> Self {
        Self {
            old_repo: old_repo.into(),
            ask_delete: true,
        }
    }

    /// Load the marker from a repository, returning `None` if there is none.
    pub fn load(repo_path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = marker_path(repo_path);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read cleanup marker {}", path.display()))?;
        let marker = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse cleanup marker {}", path.display()))?;
        Ok(Some(marker))
    }

    /// Write the marker into `repo_path`.
    pub fn persist(&self, repo_path: impl AsRef<Path>) -> Result<()> {
        let path = marker_path(repo_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize cleanup marker")?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write cleanup marker {}", path.display()))
    }

    /// Remove the marker once the user has answered.
    pub fn discard(repo_path: impl AsRef<Path>) -> Result<()> {
        let path = marker_path(repo_path);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove cleanup marker {}", path.display()))?;
        }
        Ok(())
    }
}

/// Location of the marker inside a repository directory.
pub fn marker_path(repo_path: impl AsRef<Path>) -> PathBuf {
    repo_path.as_ref().join(CLEANUP_FILE)
}
