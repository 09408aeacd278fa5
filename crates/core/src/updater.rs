//! Program update detection and relaunch.

use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::launcher::Launcher;

/// Reports whether a newer launcher is available and starts it.
pub trait UpdateChecker {
    /// A version newer than the running one was announced.
    fn has_new_update(&self) -> bool;
    /// The announced version, empty when there is none.
    fn new_version(&self) -> &str;
    /// Where the announced executable lives.
    fn new_exe_path(&self) -> Option<&Path>;
    /// Start the new executable. `false` means nothing was launched.
    fn launch_new(&mut self) -> bool;
    /// Re-read whatever source announces new versions.
    fn poll(&mut self) -> Result<()>;
}

/// Version manifest published on the program channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionManifest {
    /// Dotted version string.
    pub version: String,
    /// Executable path, relative to the manifest's repository root.
    pub exe: PathBuf,
}

/// [`UpdateChecker`] driven by a `version.json` manifest.
pub struct Updater {
    current_version: String,
    manifest_path: PathBuf,
    repo_root: PathBuf,
    launcher: Box<dyn Launcher>,
    has_new_update: bool,
    new_version: String,
    new_exe_path: Option<PathBuf>,
}

impl Updater {
    /// `manifest_path` is re-read on every [`UpdateChecker::poll`].
    pub fn new(
        current_version: impl Into<String>,
        repo_root: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        Self {
            current_version: current_version.into(),
            manifest_path: manifest_path.into(),
            repo_root: repo_root.into(),
            launcher,
            has_new_update: false,
            new_version: String::new(),
            new_exe_path: None,
        }
    }

    /// Version of the running executable.
    pub fn current_version(&self) -> &str {
        &self.current_version
    }
}

impl UpdateChecker for Updater {
    fn has_new_update(&self) -> bool {
        self.has_new_update
    }

    fn new_version(&self) -> &str {
        &self.new_version
    }

    fn new_exe_path(&self) -> Option<&Path> {
        self.new_exe_path.as_deref()
    }

    fn launch_new(&mut self) -> bool {
        if !self.has_new_update {
            return false;
        }
        let Some(exe) = self.new_exe_path.as_deref() else {
            return false;
        };
        let workdir = exe.parent().unwrap_or(&self.repo_root);
        match self.launcher.run(exe, workdir) {
            Ok(()) => true,
            Err(err) => {
                warn!("could not start new version: {err:#}");
                false
            }
        }
    }

    fn poll(&mut self) -> Result<()> {
        if !self.manifest_path.exists() {
            return Ok(());
        }
        let content = fs::read_to_string(&self.manifest_path)
            .with_context(|| format!("failed to read {}", self.manifest_path.display()))?;
        let manifest: VersionManifest = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.manifest_path.display()))?;

        if compare_versions(&manifest.version, &self.current_version) != Ordering::Greater {
            return Ok(());
        }
        let exe = self.repo_root.join(&manifest.exe);
        if !exe.is_file() {
            warn!(version = %manifest.version, exe = %exe.display(), "new version announced but executable missing");
            return Ok(());
        }

        info!(version = %manifest.version, "new program version available");
        self.has_new_update = true;
        self.new_version = manifest.version;
        self.new_exe_path = Some(exe);
        Ok(())
    }
}

/// Compare dotted version strings numerically, component by component.
/// Non-numeric components compare as text.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.');
    let mut right = b.trim().split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(x), None) => {
                return if is_zero(x) {
                    continue_cmp(&mut left)
                } else {
                    Ordering::Greater
                }
            }
            (None, Some(y)) => {
                return if is_zero(y) {
                    continue_cmp(&mut right).reverse()
                } else {
                    Ordering::Less
                }
            }
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn is_zero(part: &str) -> bool {
    part.parse::<u64>().map(|value| value == 0).unwrap_or(false)
}

fn continue_cmp<'a>(rest: &mut impl Iterator<Item = &'a str>) -> Ordering {
    if rest.all(is_zero) {
        Ordering::Equal
    } else {
        Ordering::Greater
    }
}
