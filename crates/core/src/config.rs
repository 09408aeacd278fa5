//! Application configuration and the persisted repository path.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Directory name under the platform config/data roots.
pub const APP_DIR: &str = "tiggit";
/// File name of the main configuration file.
pub const CONFIG_FILE: &str = "config.json";
/// Default data channel name inside `spread/channels`.
pub const DEFAULT_CHANNEL: &str = "tigdata";

/// Runtime configuration for the launcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Current repository location. `None` means the platform default.
    #[serde(default)]
    pub repo_path: Option<PathBuf>,
    /// Base URL the channel files are fetched from. No fetching when unset.
    #[serde(default)]
    pub update_url: Option<String>,
    /// Name of the data channel directory.
    #[serde(default = "default_channel")]
    pub data_channel: String,
    /// Watch the channel directories for changes written by other processes.
    #[serde(default = "default_watch")]
    pub watch_channels: bool,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_watch() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repo_path: None,
            update_url: None,
            data_channel: default_channel(),
            watch_channels: default_watch(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file, overlaid with `TIGGIT_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(config_file_path())
    }

    /// Load from an explicit file. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(Environment::with_prefix("TIGGIT"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config = settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Repository location, falling back to the platform default.
    pub fn resolved_repo_path(&self) -> PathBuf {
        self.repo_path.clone().unwrap_or_else(default_repo_path)
    }
}

/// Location of the main configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Default repository location when none has been stored.
pub fn default_repo_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(config_file_path())
}

/// Same as [`ensure_default_config`] for an explicit file.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default configuration")?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write default configuration {}", path.display()))?;
    info!(path = %path.display(), "default configuration written");
    Ok(())
}

/// Persists the "current repository path" setting inside the config file.
#[derive(Debug, Clone)]
pub struct PathStore {
    file: PathBuf,
}

impl PathStore {
    /// Store backed by the given configuration file.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// Store backed by the default configuration file.
    pub fn default_location() -> Self {
        Self::new(config_file_path())
    }

    /// Path of the backing file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Currently stored repository path, if any.
    pub fn load(&self) -> Result<Option<PathBuf>> {
        let object = self.read_object()?;
        Ok(object
            .get("repo_path")
            .and_then(Value::as_str)
            .map(PathBuf::from))
    }

    /// Replace the stored repository path. Other keys in the file are kept.
    ///
    /// The file is swapped in with a rename so readers never observe a
    /// half-written configuration.
    pub fn store(&self, repo_path: &Path) -> Result<()> {
        let mut object = self.read_object()?;
        object.insert(
            "repo_path".to_string(),
            Value::String(repo_path.to_string_lossy().into_owned()),
        );

        let dir = self
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;

        let serialized = serde_json::to_vec_pretty(&Value::Object(object))
            .context("failed to serialize configuration")?;
        let mut temp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
        temp.write_all(&serialized)
            .context("failed to write temporary configuration")?;
        temp.persist(&self.file)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to replace {}", self.file.display()))?;

        info!(path = %repo_path.display(), "stored repository path updated");
        Ok(())
    }

    fn read_object(&self) -> Result<Map<String, Value>> {
        if !self.file.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", self.file.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("{} does not contain a JSON object", self.file.display()),
        }
    }
}
