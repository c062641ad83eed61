//! Export summary and reporting
//!
//! Condenses a [`RunReport`] into counts, the list of failed spaces and the
//! process exit status.

use super::scheduler::RunReport;
use super::task::TaskStatus;
use crate::domain::{ExportError, SpaceKey};
use std::time::Duration;

/// Exit status for a run where every space succeeded
pub const EXIT_SUCCESS: i32 = 0;
/// At least one space failed
pub const EXIT_PARTIAL_FAILURE: i32 = 1;
/// Configuration could not be loaded or is invalid
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// Credentials rejected or service unreachable; run aborted
pub const EXIT_AUTH_ERROR: i32 = 4;
/// Unexpected failure
pub const EXIT_FATAL: i32 = 5;
/// Stopped by SIGINT/SIGTERM
pub const EXIT_INTERRUPTED: i32 = 130;

/// A space that did not end with an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSpace {
    pub space_key: SpaceKey,
    pub status: TaskStatus,
    pub error: Option<String>,
}

/// Summary of an export run
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub total_spaces: usize,
    pub completed: usize,
    pub cached: usize,
    pub failed: usize,
    pub aborted: usize,
    pub not_attempted: usize,
    /// Requested spaces the service did not list
    pub missing: Vec<SpaceKey>,
    pub bytes_downloaded: u64,
    pub duration: Duration,
    pub failures: Vec<FailedSpace>,
    pub fatal_error: Option<ExportError>,
    pub interrupted: bool,
    pub dry_run: bool,
}

impl ExportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a summary from a finished run
    pub fn from_report(report: &RunReport) -> Self {
        let failures = report
            .outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| FailedSpace {
                space_key: o.space_key.clone(),
                status: o.status,
                error: o.error.as_ref().map(ToString::to_string),
            })
            .collect();

        Self {
            total_spaces: report.outcomes.len(),
            completed: report.count(TaskStatus::Completed),
            cached: report.count(TaskStatus::Cached),
            failed: report.count(TaskStatus::Failed),
            aborted: report.count(TaskStatus::Aborted),
            not_attempted: report.count(TaskStatus::NotAttempted),
            missing: Vec::new(),
            bytes_downloaded: report.totals.bytes,
            duration: report.duration,
            failures,
            fatal_error: report.fatal_error.clone(),
            interrupted: report.interrupted,
            dry_run: false,
        }
    }

    pub fn with_missing(mut self, missing: Vec<SpaceKey>) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Check if the export was successful (every space has an archive)
    pub fn is_successful(&self) -> bool {
        self.failures.is_empty() && self.fatal_error.is_none() && !self.interrupted
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_spaces == 0 {
            return 100.0;
        }
        ((self.completed + self.cached) as f64 / self.total_spaces as f64) * 100.0
    }

    /// Process exit status for this run
    ///
    /// Interruption wins over an auth abort, which wins over plain failures.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            EXIT_INTERRUPTED
        } else if self.fatal_error.as_ref().is_some_and(ExportError::is_run_fatal) {
            EXIT_AUTH_ERROR
        } else if !self.failures.is_empty() {
            EXIT_PARTIAL_FAILURE
        } else {
            EXIT_SUCCESS
        }
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total_spaces,
            completed = self.completed,
            cached = self.cached,
            failed = self.failed,
            aborted = self.aborted,
            not_attempted = self.not_attempted,
            bytes = self.bytes_downloaded,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            dry_run = self.dry_run,
            "Export completed"
        );

        if let Some(error) = &self.fatal_error {
            tracing::error!(error = %error, "Run aborted");
        }
        if self.interrupted {
            tracing::warn!("Run interrupted by shutdown signal");
        }
        for key in &self.missing {
            tracing::warn!(space_key = %key, "Requested space not found");
        }
        for failure in &self.failures {
            tracing::warn!(
                space_key = %failure.space_key,
                status = %failure.status,
                error = failure.error.as_deref().unwrap_or(""),
                "Space not exported"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::task::TaskOutcome;

    fn key(k: &str) -> SpaceKey {
        SpaceKey::new(k).unwrap()
    }

    fn outcome(k: &str, status: TaskStatus, error: Option<ExportError>) -> TaskOutcome {
        TaskOutcome {
            status,
            error,
            ..TaskOutcome::not_attempted(key(k))
        }
    }

    #[test]
    fn test_all_successful() {
        let report = RunReport {
            outcomes: vec![
                outcome("A", TaskStatus::Completed, None),
                outcome("B", TaskStatus::Cached, None),
            ],
            ..RunReport::default()
        };
        let summary = ExportSummary::from_report(&report);

        assert!(summary.is_successful());
        assert_eq!(summary.exit_code(), EXIT_SUCCESS);
        assert_eq!(summary.success_rate(), 100.0);
    }

    #[test]
    fn test_partial_failure() {
        let report = RunReport {
            outcomes: vec![
                outcome("A", TaskStatus::Completed, None),
                outcome("B", TaskStatus::Failed, Some(ExportError::JobFailed("too big".into()))),
            ],
            ..RunReport::default()
        };
        let summary = ExportSummary::from_report(&report);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].space_key, key("B"));
        assert_eq!(summary.exit_code(), EXIT_PARTIAL_FAILURE);
        assert_eq!(summary.success_rate(), 50.0);
    }

    #[test]
    fn test_auth_abort_and_interrupt_codes() {
        let auth = ExportError::Auth("HTTP 403".into());
        let mut report = RunReport {
            outcomes: vec![
                outcome("A", TaskStatus::Failed, Some(auth.clone())),
                outcome("B", TaskStatus::NotAttempted, None),
            ],
            fatal_error: Some(auth),
            ..RunReport::default()
        };
        assert_eq!(ExportSummary::from_report(&report).exit_code(), EXIT_AUTH_ERROR);

        report.interrupted = true;
        assert_eq!(ExportSummary::from_report(&report).exit_code(), EXIT_INTERRUPTED);
    }

    #[test]
    fn test_empty_run() {
        let summary = ExportSummary::new();
        assert!(summary.is_successful());
        assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    }
}
