//! Tracking of in-flight download and install jobs.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::models::InfoLookup;

/// What a job is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Fetching game files.
    Download,
    /// Unpacking a finished download.
    Install,
}

/// Snapshot of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Game the job belongs to.
    pub game_id: String,
    /// Kind of work in progress.
    pub kind: JobKind,
    /// Completion in `0.0..=1.0`.
    pub progress: f32,
    /// Load generation of the record the job is attached to.
    pub generation: u64,
    /// Set when the game disappeared from the catalogue during a reload.
    pub orphaned: bool,
}

/// Shared handle over the running jobs.
///
/// Download and install workers clone the handle and drive
/// [`JobTracker::start`], [`JobTracker::set_progress`] and
/// [`JobTracker::finish`]. The orchestrator only reads it: it re-points jobs
/// at fresh records after each repository reload and refuses to relocate
/// while any job is registered.
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    jobs: Arc<Mutex<Vec<Job>>>,
}

impl JobTracker {
    /// Tracker with no jobs.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while any job is registered.
    pub fn has_jobs(&self) -> bool {
        !self.jobs.lock().is_empty()
    }

    /// Register a job. Replaces any previous job for the same game.
    pub fn start(&self, game_id: &str, kind: JobKind, generation: u64) {
        let mut jobs = self.jobs.lock();
        jobs.retain(|job| job.game_id != game_id);
        jobs.push(Job {
            game_id: game_id.to_string(),
            kind,
            progress: 0.0,
            generation,
            orphaned: false,
        });
        debug!(game_id, ?kind, "job started");
    }

    /// Update a job's completion, clamped to `0.0..=1.0`. Unknown ids are ignored.
    pub fn set_progress(&self, game_id: &str, progress: f32) {
        if let Some(job) = self
            .jobs
            .lock()
            .iter_mut()
            .find(|job| job.game_id == game_id)
        {
            job.progress = progress.clamp(0.0, 1.0);
        }
    }

    /// Remove the job for `game_id`. Returns whether one existed.
    pub fn finish(&self, game_id: &str) -> bool {
        let mut jobs = self.jobs.lock();
        let before = jobs.len();
        jobs.retain(|job| job.game_id != game_id);
        before != jobs.len()
    }

    /// Snapshot of every job.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().clone()
    }

    /// Attach every job to the record with the same game id in `list`.
    /// Returns the number of jobs that found their game.
    pub fn reassign_jobs(&self, list: &InfoLookup) -> usize {
        let mut reassigned = 0;
        for job in self.jobs.lock().iter_mut() {
            match list.get(&job.game_id) {
                Some(info) => {
                    job.generation = info.generation;
                    job.orphaned = false;
                    reassigned += 1;
                }
                None => {
                    warn!(game_id = %job.game_id, "job kept without a catalogue entry");
                    job.orphaned = true;
                }
            }
        }
        reassigned
    }
}
