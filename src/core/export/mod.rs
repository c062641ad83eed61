//! Export orchestration
//!
//! This module provides the export engine:
//! - Job submission, polling and resumable download
//! - Per-space tasks with retry
//! - Batch scheduling under a concurrency limit
//! - Progress tracking and the run summary

pub mod batch;
pub mod coordinator;
pub mod downloader;
pub mod poller;
pub mod progress;
pub mod scheduler;
pub mod settings;
pub mod submitter;
pub mod summary;
pub mod task;

pub use batch::{partition, BatchResult};
pub use coordinator::{open_cache, ExportCoordinator};
pub use downloader::{ChunkedDownloader, DownloadOutcome, TransferStats};
pub use poller::JobPoller;
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use scheduler::{BatchScheduler, RunReport};
pub use settings::ExportSettings;
pub use submitter::{JobSubmitter, SubmissionThrottle};
pub use summary::{ExportSummary, FailedSpace};
pub use task::{ExportTask, TaskContext, TaskOutcome, TaskStatus};
