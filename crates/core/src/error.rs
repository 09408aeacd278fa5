//! Typed errors surfaced by the orchestrator.

use thiserror::Error;

/// Failures a caller of [`crate::GameData`] may want to match on.
#[derive(Debug, Error)]
pub enum GameDataError {
    /// A notification button was pressed that the orchestrator never showed.
    #[error("unknown notification id {0}")]
    UnknownNotification(i32),
    /// The data reload sequence failed part way through.
    #[error("failed to load game data: {0:#}")]
    Load(anyhow::Error),
}
