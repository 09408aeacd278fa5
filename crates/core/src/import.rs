//! Importing repository content from one location into another.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use crate::spread::SyncEngine;

/// Directories that make up a repository's core data.
pub const CORE_DIRS: &[&str] = &["gamedata", "shots"];
/// Extensions of root-level configuration files carried by an import.
pub const CONFIG_EXTENSIONS: &[&str] = &["json", "conf"];
/// Root-level files that belong to the old location and are never imported.
const SKIPPED_FILES: &[&str] = &["cleanup.json"];

/// Moves repository content with user-visible progress.
///
/// `Ok(false)` means the user cancelled; errors are returned as-is.
pub trait Importer {
    /// Import games, screenshots and configuration from `src` into `dst`.
    fn import_repo(
        &mut self,
        src: &Path,
        dst: &Path,
        engine: &dyn SyncEngine,
        delete_source: bool,
    ) -> Result<bool>;

    /// Copy one directory tree, labelled for progress display.
    fn copy_files(
        &mut self,
        src: &Path,
        dst: &Path,
        engine: &dyn SyncEngine,
        label: &str,
    ) -> Result<bool>;
}

/// Progress callback: `(label, files copied so far)`.
pub type ProgressFn = Box<dyn FnMut(&str, u64) -> bool>;

/// Default importer. Reports progress through `tracing` and an optional
/// callback that can cancel between steps by returning `false`.
#[derive(Default)]
pub struct RepoImporter {
    progress: Option<ProgressFn>,
}

impl RepoImporter {
    /// Importer that never cancels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Importer reporting to `progress` after each step.
    pub fn with_progress(progress: ProgressFn) -> Self {
        Self {
            progress: Some(progress),
        }
    }

    fn report(&mut self, label: &str, files: u64) -> bool {
        info!(label, files, "import progress");
        match self.progress.as_mut() {
            Some(callback) => callback(label, files),
            None => true,
        }
    }
}

impl Importer for RepoImporter {
    fn import_repo(
        &mut self,
        src: &Path,
        dst: &Path,
        engine: &dyn SyncEngine,
        delete_source: bool,
    ) -> Result<bool> {
        info!(src = %src.display(), dst = %dst.display(), delete_source, "importing repository");
        fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;

        let mut files = 0;
        for dir in CORE_DIRS {
            let from = src.join(dir);
            if !from.is_dir() {
                continue;
            }
            files += engine.copy_tree(&from, &dst.join(dir))?.files;
            if !self.report("Importing game data", files) {
                return Ok(false);
            }
        }

        for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() || !is_config_file(&entry.path()) {
                continue;
            }
            engine.copy_file(&entry.path(), &dst.join(entry.file_name()))?;
            files += 1;
        }
        if !self.report("Importing configuration", files) {
            return Ok(false);
        }

        if delete_source {
            for dir in CORE_DIRS {
                let from = src.join(dir);
                if from.exists() {
                    engine.remove_tree(&from)?;
                }
            }
        }

        Ok(true)
    }

    fn copy_files(
        &mut self,
        src: &Path,
        dst: &Path,
        engine: &dyn SyncEngine,
        label: &str,
    ) -> Result<bool> {
        info!(src = %src.display(), dst = %dst.display(), "{label}");
        let report = engine.copy_tree(src, dst)?;
        Ok(self.report(label, report.files))
    }
}

fn is_config_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|name| name.to_str()).unwrap_or("");
    if SKIPPED_FILES.contains(&name) {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| CONFIG_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}
