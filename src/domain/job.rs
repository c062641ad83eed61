//! Per-space export job record
//!
//! An [`ExportJob`] is owned by exactly one task for the lifetime of a run.
//! Its resume state (`bytes_downloaded`, `partial_path`) is plain data so a
//! retried download can pick up where the previous attempt stopped.

use super::checksum::Checksum;
use super::ids::{JobId, SpaceKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Submitting,
    Polling,
    Downloading,
    Verifying,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether the state machine permits moving from `self` to `to`
    ///
    /// Self-loops on Submitting, Polling and Downloading are retries.
    /// Verifying may fall back to Downloading after an integrity failure.
    pub fn can_transition_to(self, to: JobState) -> bool {
        use JobState::*;
        match (self, to) {
            (Completed, _) | (Failed, _) => false,
            (_, Failed) => true,
            (Queued, Submitting) => true,
            (Submitting, Submitting) | (Submitting, Polling) => true,
            (Polling, Polling) | (Polling, Downloading) => true,
            (Downloading, Downloading) | (Downloading, Verifying) => true,
            (Verifying, Completed) | (Verifying, Downloading) => true,
            _ => false,
        }
    }
}

impl JobState {
    fn same_phase(self, other: JobState) -> bool {
        use JobState::*;
        self == other || matches!((self, other), (Downloading, Verifying) | (Verifying, Downloading))
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Submitting => "submitting",
            JobState::Polling => "polling",
            JobState::Downloading => "downloading",
            JobState::Verifying => "verifying",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Rejected state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid job transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Mutable record of one space's export within a run
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub space_key: SpaceKey,
    state: JobState,
    pub job_id: Option<JobId>,
    pub download_url: Option<String>,
    pub expected_size: Option<u64>,
    pub checksum: Option<Checksum>,
    pub bytes_downloaded: u64,
    pub partial_path: PathBuf,
    pub final_path: PathBuf,
    /// Attempts made in the current phase
    pub attempt_count: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ExportJob {
    /// Creates a queued job writing to `final_path` via `<final_path>.part`
    pub fn new(space_key: SpaceKey, final_path: PathBuf) -> Self {
        let mut partial = final_path.clone().into_os_string();
        partial.push(".part");

        Self {
            space_key,
            state: JobState::Queued,
            job_id: None,
            download_url: None,
            expected_size: None,
            checksum: None,
            bytes_downloaded: 0,
            partial_path: PathBuf::from(partial),
            final_path,
            attempt_count: 0,
            next_retry_at: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Moves the job to `to`, returning the previous state
    ///
    /// Entering a new phase resets the attempt counter; entering Completed
    /// also clears `last_error`. Downloading and Verifying count as one
    /// phase, so a failed verification consumes a download attempt.
    pub fn transition(&mut self, to: JobState) -> Result<JobState, InvalidTransition> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(InvalidTransition { from, to });
        }

        if !from.same_phase(to) {
            self.attempt_count = 0;
            self.next_retry_at = None;
        }
        if to == JobState::Completed {
            self.last_error = None;
        }
        self.state = to;
        Ok(from)
    }

    /// Drops resume state so the next download starts from byte zero
    pub fn reset_download(&mut self) {
        self.bytes_downloaded = 0;
    }
}
