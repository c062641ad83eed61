//! Per-space export task
//!
//! An [`ExportTask`] drives one space through
//! `Queued -> Submitting -> Polling -> Downloading -> Verifying -> Completed`,
//! retrying each phase under the shared [`RetryPolicy`]. Any unrecoverable
//! error moves the job to `Failed`.

use super::downloader::{ChunkedDownloader, DownloadOutcome};
use super::poller::JobPoller;
use super::progress::ProgressTracker;
use super::submitter::JobSubmitter;
use crate::core::cache::{CacheEntry, CacheStore};
use crate::core::cancel::CancelSignal;
use crate::core::retry::RetryPolicy;
use crate::domain::{ExportError, ExportJob, JobState, Space, SpaceKey};
use crate::{log_export_complete, log_export_start};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Final disposition of one space in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Archive downloaded and verified
    Completed,
    /// A valid archive from an earlier run was reused
    Cached,
    Failed,
    /// Stopped by cancellation after starting
    Aborted,
    /// Never started because the run stopped first
    NotAttempted,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Cached => "cached",
            TaskStatus::Failed => "failed",
            TaskStatus::Aborted => "aborted",
            TaskStatus::NotAttempted => "not attempted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub space_key: SpaceKey,
    pub status: TaskStatus,
    pub file_path: Option<PathBuf>,
    pub bytes: u64,
    pub error: Option<ExportError>,
}

impl TaskOutcome {
    fn new(space_key: SpaceKey, status: TaskStatus) -> Self {
        Self {
            space_key,
            status,
            file_path: None,
            bytes: 0,
            error: None,
        }
    }

    pub fn cached(entry: &CacheEntry) -> Self {
        Self {
            file_path: Some(entry.file_path.clone()),
            bytes: entry.size_bytes,
            ..Self::new(entry.space_key.clone(), TaskStatus::Cached)
        }
    }

    pub fn not_attempted(space_key: SpaceKey) -> Self {
        Self::new(space_key, TaskStatus::NotAttempted)
    }

    /// Whether this outcome must stop the whole run
    pub fn is_run_fatal(&self) -> bool {
        self.error.as_ref().is_some_and(ExportError::is_run_fatal)
    }

    /// Whether the space has a usable archive after the run
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Cached)
    }
}

/// Components shared by every task in a run
#[derive(Clone)]
pub struct TaskContext {
    pub submitter: JobSubmitter,
    pub poller: JobPoller,
    pub downloader: ChunkedDownloader,
    pub policy: RetryPolicy,
    pub cache: Arc<CacheStore>,
    pub tracker: Arc<ProgressTracker>,
    pub output_dir: PathBuf,
    pub format: crate::domain::ExportFormat,
}

pub struct ExportTask {
    job: ExportJob,
    ctx: Arc<TaskContext>,
}

impl ExportTask {
    /// Prepares a task writing to `<output_dir>/<archive name>`
    pub fn new(space: &Space, ctx: Arc<TaskContext>) -> Self {
        let final_path = ctx.output_dir.join(space.archive_file_name(ctx.format));
        Self {
            job: ExportJob::new(space.key.clone(), final_path),
            ctx,
        }
    }

    pub fn job(&self) -> &ExportJob {
        &self.job
    }

    /// Runs the task to an outcome
    pub async fn run(mut self, cancel: &CancelSignal) -> TaskOutcome {
        let key = self.job.space_key.clone();

        if cancel.is_cancelled() {
            self.ctx.tracker.record_not_attempted(&key);
            return TaskOutcome::not_attempted(key);
        }

        let started = Instant::now();
        log_export_start!(&key, self.ctx.format);

        match self.execute(cancel).await {
            Ok(download) => {
                self.record_in_cache(&download).await;
                log_export_complete!(&key, download.bytes, started.elapsed());
                TaskOutcome {
                    file_path: Some(download.path),
                    bytes: download.bytes,
                    ..TaskOutcome::new(key, TaskStatus::Completed)
                }
            }
            Err(ExportError::Cancelled) => {
                let state = self.job.state();
                if state == JobState::Queued {
                    self.ctx.tracker.record_not_attempted(&key);
                    return TaskOutcome::not_attempted(key);
                }
                self.ctx.tracker.record_aborted(&key, state);
                tracing::warn!(
                    space_key = %key,
                    state = %state,
                    bytes_downloaded = self.job.bytes_downloaded,
                    "Space export aborted"
                );
                TaskOutcome {
                    error: Some(ExportError::Cancelled),
                    ..TaskOutcome::new(key, TaskStatus::Aborted)
                }
            }
            Err(error) => {
                let failed_in = self.job.state();
                self.job.last_error = Some(error.to_string());
                self.advance(JobState::Failed);
                tracing::error!(
                    space_key = %key,
                    phase = %failed_in,
                    attempts = self.job.attempt_count,
                    error = %error,
                    "Space export failed"
                );
                TaskOutcome {
                    error: Some(error),
                    ..TaskOutcome::new(key, TaskStatus::Failed)
                }
            }
        }
    }

    async fn execute(&mut self, cancel: &CancelSignal) -> Result<DownloadOutcome, ExportError> {
        // A task cancelled while queued on the throttle is still Queued.
        self.ctx.submitter.wait_turn(cancel).await?;
        self.advance(JobState::Submitting);
        let job_id = loop {
            match self.ctx.submitter.submit(&self.job.space_key, cancel).await {
                Ok(job_id) => break job_id,
                Err(error) => {
                    self.retry(error, cancel).await?;
                    self.ctx.submitter.wait_turn(cancel).await?;
                }
            }
        };
        self.job.job_id = Some(job_id);

        self.advance(JobState::Polling);
        let ready = self.ctx.poller.poll_until_ready(&mut self.job, cancel).await?;
        if let Some(size) = ready.expected_size {
            self.ctx.tracker.add_expected(size);
        }
        self.job.download_url = Some(ready.download_url);
        self.job.expected_size = ready.expected_size;
        self.job.checksum = ready.checksum;

        self.advance(JobState::Downloading);
        loop {
            if let Err(error) = self.ctx.downloader.download(&mut self.job, cancel).await {
                self.retry(error, cancel).await?;
                continue;
            }

            self.advance(JobState::Verifying);
            match self.ctx.downloader.verify(&mut self.job).await {
                Ok(outcome) => {
                    self.advance(JobState::Completed);
                    return Ok(outcome);
                }
                Err(error) => {
                    self.retry(error, cancel).await?;
                    self.advance(JobState::Downloading);
                }
            }
        }
    }

    /// Backs off after `error`, or returns it when the policy gives up
    ///
    /// Integrity failures discard the partial file first so the retry
    /// downloads from byte zero.
    async fn retry(&mut self, error: ExportError, cancel: &CancelSignal) -> Result<(), ExportError> {
        if matches!(error, ExportError::Cancelled) {
            return Err(error);
        }
        if matches!(error, ExportError::Integrity(_)) {
            tracing::warn!(
                space_key = %self.job.space_key,
                error = %error,
                "Discarding partial archive"
            );
            self.ctx.downloader.discard_partial(&mut self.job).await?;
        }
        self.ctx.policy.backoff(&mut self.job, error, cancel).await
    }

    fn advance(&mut self, to: JobState) {
        match self.job.transition(to) {
            Ok(from) => self.ctx.tracker.observe(&self.job.space_key, from, to),
            Err(e) => tracing::error!(space_key = %self.job.space_key, error = %e, "Invalid job transition"),
        }
    }

    async fn record_in_cache(&self, download: &DownloadOutcome) {
        let mut entry = CacheEntry::new(
            self.job.space_key.clone(),
            download.path.clone(),
            download.bytes,
        );
        if let Some(checksum) = &self.job.checksum {
            entry = entry.with_checksum(checksum.to_string());
        }

        if let Err(e) = self.ctx.cache.write(entry).await {
            tracing::warn!(
                space_key = %self.job.space_key,
                error = %e,
                "Failed to record completed export in cache"
            );
        }
    }
}
