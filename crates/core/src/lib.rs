#![warn(clippy::all, missing_docs)]

//! Core logic of the Tiggit game launcher.
//!
//! This crate hosts the data models, configuration handling, the data
//! repository and its news feed, the filtered game lists, and the
//! [`GameData`] orchestrator that reacts to updates and relocates the
//! repository. Frontends only implement [`Frontend`] and drive the
//! orchestrator from their event loop.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod extra;
pub mod filter;
pub mod frontend;
pub mod gamedata;
pub mod import;
pub mod jobs;
pub mod launcher;
pub mod models;
pub mod news;
pub mod repo;
pub mod settings;
pub mod spread;
pub mod sync;
pub mod updater;
pub mod watch;

pub use config::{AppConfig, PathStore};
pub use error::GameDataError;
pub use filter::{GameList, GamePicker, ListKind};
pub use frontend::Frontend;
pub use gamedata::{GameData, RelocationOutcome, RelocationStage, UpdateOutcome, UpdateState};
pub use models::{GameInfo, InstallStatus, LiveInfo};
pub use repo::{LocalRepo, Repository};
pub use sync::{ChannelSync, SyncEvent};
