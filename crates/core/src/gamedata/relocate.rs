//! Moving the whole repository to a new directory.
//!
//! Every step gates the next and nothing is rolled back: a half-copied
//! destination is left in place for the user to deal with. The persisted
//! repository path is switched only after all content has been copied.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use super::GameData;
use crate::{
    cleanup::CleanupMarker,
    launcher::EXE_NAME,
    repo::{CACHE_CONF, CHANNELS_DIR, RUN_DIR},
};

/// Copy steps of a relocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationStage {
    /// Games, screenshots and configuration files.
    Import,
    /// The `run` directory.
    Executables,
    /// Channel data under `spread/channels`.
    SyncChannels,
    /// `spread/cache.conf`.
    CacheConfig,
    /// `cleanup.json` in the new location.
    CleanupMarker,
    /// The persisted repository path.
    SwitchPath,
}

impl fmt::Display for RelocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RelocationStage::Import => "importing game data",
            RelocationStage::Executables => "copying executables",
            RelocationStage::SyncChannels => "copying channel data",
            RelocationStage::CacheConfig => "copying cache configuration",
            RelocationStage::CleanupMarker => "writing cleanup marker",
            RelocationStage::SwitchPath => "switching repository path",
        };
        f.write_str(label)
    }
}

/// Result of [`GameData::move_repo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// The target cannot be written to. Nothing was attempted.
    NotWritable,
    /// The target is the current repository. Nothing to do.
    Unchanged,
    /// Downloads or installs are running. Reported to the user.
    JobsInProgress,
    /// A step failed or was cancelled; earlier steps stay in place.
    StepFailed(RelocationStage),
    /// The new location is now the stored repository path.
    Success {
        /// Whether the launcher in the new location was started.
        relaunched: bool,
    },
}

impl RelocationOutcome {
    /// `false` only when the move was not even attempted because the target
    /// is not writable.
    pub fn attempted(&self) -> bool {
        !matches!(self, RelocationOutcome::NotWritable)
    }
}

/// Check that `path` is (or can become) a writable directory.
///
/// Directories created for the probe are removed again.
pub fn is_writable(path: &Path) -> bool {
    if path.exists() {
        return path.is_dir() && tempfile::tempfile_in(path).is_ok();
    }

    let mut missing: Vec<PathBuf> = Vec::new();
    let mut cursor = Some(path);
    while let Some(dir) = cursor {
        if dir.as_os_str().is_empty() || dir.exists() {
            break;
        }
        missing.push(dir.to_path_buf());
        cursor = dir.parent();
    }

    let writable = fs::create_dir_all(path).is_ok() && tempfile::tempfile_in(path).is_ok();
    for dir in &missing {
        let _ = fs::remove_dir(dir);
    }
    writable
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

struct StepFailure {
    stage: RelocationStage,
    /// `None` when the step was cancelled by the user.
    error: Option<anyhow::Error>,
}

impl StepFailure {
    fn error(stage: RelocationStage) -> impl FnOnce(anyhow::Error) -> Self {
        move |error| Self {
            stage,
            error: Some(error),
        }
    }
}

fn gate(stage: RelocationStage, result: anyhow::Result<bool>) -> Result<(), StepFailure> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(StepFailure { stage, error: None }),
        Err(error) => Err(StepFailure {
            stage,
            error: Some(error),
        }),
    }
}

impl GameData {
    /// Move the repository to `new_path` and relaunch from there.
    pub fn move_repo(&mut self, new_path: &Path) -> RelocationOutcome {
        info!(new_path = %new_path.display(), "moving repository");

        if !is_writable(new_path) {
            warn!(new_path = %new_path.display(), "target is not writable");
            return RelocationOutcome::NotWritable;
        }

        let old_path = self.repo.path().to_path_buf();
        if same_location(&old_path, new_path) {
            info!("target is the current repository");
            return RelocationOutcome::Unchanged;
        }

        // TODO: stash running jobs and resume them after the restart instead of refusing.
        if self.jobs.has_jobs() {
            self.report_error("Cannot change directories while downloads are in progress");
            return RelocationOutcome::JobsInProgress;
        }

        match self.relocate(&old_path, new_path) {
            Ok(relaunched) => RelocationOutcome::Success { relaunched },
            Err(StepFailure { stage, error }) => {
                match error {
                    Some(error) => self.report_error(&format!("Failed {stage}: {error:#}")),
                    None => info!(%stage, "relocation cancelled"),
                }
                RelocationOutcome::StepFailed(stage)
            }
        }
    }

    fn relocate(&mut self, old: &Path, new: &Path) -> Result<bool, StepFailure> {
        let engine = self.repo.sync_engine();

        // Games, screenshots and configuration; sources are kept.
        gate(
            RelocationStage::Import,
            self.importer.import_repo(old, new, engine, false),
        )?;
        gate(
            RelocationStage::Executables,
            self.importer.copy_files(
                &old.join(RUN_DIR),
                &new.join(RUN_DIR),
                engine,
                "Copying executables",
            ),
        )?;
        gate(
            RelocationStage::SyncChannels,
            self.importer.copy_files(
                &old.join(CHANNELS_DIR),
                &new.join(CHANNELS_DIR),
                engine,
                "Copying Tiggit data",
            ),
        )?;
        engine
            .copy_file(&old.join(CACHE_CONF), &new.join(CACHE_CONF))
            .map_err(StepFailure::error(RelocationStage::CacheConfig))?;

        CleanupMarker::new(old)
            .persist(new)
            .map_err(StepFailure::error(RelocationStage::CleanupMarker))?;

        // Point of no return.
        self.repo
            .set_stored_path(new)
            .map_err(StepFailure::error(RelocationStage::SwitchPath))?;
        info!(new_path = %new.display(), "repository path switched");

        self.say("Tiggit will now restart for changes to take effect");

        let run_dir = new.join(RUN_DIR).join("1");
        let relaunched = match self.launcher.run(&run_dir.join(EXE_NAME), &run_dir) {
            Ok(()) => true,
            Err(err) => {
                self.report_error(&format!("{err:#}"));
                false
            }
        };

        self.close();
        Ok(relaunched)
    }
}
