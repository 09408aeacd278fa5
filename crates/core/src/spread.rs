//! Filesystem side of the content sync engine.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing::debug;
use walkdir::WalkDir;

/// Totals reported by a tree copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Regular files copied.
    pub files: u64,
    /// Bytes written.
    pub bytes: u64,
}

/// Engine handle used to move repository content around.
pub trait SyncEngine {
    /// Recursively copy `src` into `dst`, overwriting existing files.
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<CopyReport>;
    /// Copy a single file, creating the destination directory.
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64>;
    /// Delete a file or directory tree.
    fn remove_tree(&self, path: &Path) -> Result<()>;
}

/// [`SyncEngine`] that works directly on local directories.
#[derive(Debug, Clone, Default)]
pub struct FsSync;

impl SyncEngine for FsSync {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<CopyReport> {
        if !src.is_dir() {
            return Err(anyhow!("source directory missing: {}", src.display()));
        }

        let mut report = CopyReport::default();
        fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;

        for entry in WalkDir::new(src).follow_links(false) {
            let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
            let relative = entry
                .path()
                .strip_prefix(src)
                .with_context(|| format!("unexpected path {}", entry.path().display()))?;
            let target: PathBuf = dst.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("failed to create {}", target.display()))?;
            } else {
                report.bytes += self.copy_file(entry.path(), &target)?;
                report.files += 1;
            }
        }

        debug!(
            src = %src.display(),
            dst = %dst.display(),
            files = report.files,
            bytes = report.bytes,
            "tree copied"
        );
        Ok(report)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(src, dst)
            .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.with_context(|| format!("failed to remove {}", path.display()))
    }
}
