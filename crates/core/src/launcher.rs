//! Starting launcher executables as independent processes.

use std::{path::Path, process::Command};

use anyhow::{anyhow, Context, Result};
use tracing::info;

/// Name of the launcher executable inside a versioned run directory.
#[cfg(windows)]
pub const EXE_NAME: &str = "tiggit.exe";
/// Name of the launcher executable inside a versioned run directory.
#[cfg(not(windows))]
pub const EXE_NAME: &str = "tiggit";

/// Runs an executable.
pub trait Launcher {
    /// Start `exe` with `workdir` as its working directory without waiting for it.
    fn run(&self, exe: &Path, workdir: &Path) -> Result<()>;
}

/// Spawns a child process and lets it outlive the caller.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn run(&self, exe: &Path, workdir: &Path) -> Result<()> {
        if !exe.is_file() {
            return Err(anyhow!("executable not found: {}", exe.display()));
        }
        let child = Command::new(exe)
            .current_dir(workdir)
            .spawn()
            .with_context(|| format!("failed to launch {}", exe.display()))?;
        info!(exe = %exe.display(), pid = child.id(), "launched");
        Ok(())
    }
}
