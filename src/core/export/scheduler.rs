//! Batch scheduling of export tasks
//!
//! Spaces with a valid cache entry are reported as cached without touching
//! the network. The rest are partitioned into batches that run one after
//! another, with up to `max_concurrent` tasks in flight inside a batch.
//! Tasks are admitted in input order and complete in any order; the report
//! lists outcomes in input order.

use super::batch::{partition, BatchResult};
use super::task::{ExportTask, TaskContext, TaskOutcome, TaskStatus};
use crate::core::cancel::CancelSignal;
use crate::domain::{ExportError, Space, SpaceKey};
use crate::log_batch_processing;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One outcome per input space, in input order
    pub outcomes: Vec<TaskOutcome>,
    pub totals: BatchResult,
    pub batches: usize,
    /// Set when a run-fatal error stopped the run
    pub fatal_error: Option<ExportError>,
    /// Set when an external shutdown stopped the run
    pub interrupted: bool,
    pub duration: Duration,
}

impl RunReport {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == TaskStatus::Failed)
    }

    pub fn outcome(&self, key: &SpaceKey) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| &o.space_key == key)
    }

    /// True when every space ended completed or cached
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_success)
    }
}

pub struct BatchScheduler {
    ctx: Arc<TaskContext>,
    max_concurrent: usize,
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(ctx: Arc<TaskContext>, max_concurrent: usize, batch_size: usize) -> Self {
        Self {
            ctx,
            max_concurrent: max_concurrent.max(1),
            batch_size,
        }
    }

    /// Exports `spaces` until done, aborted or interrupted
    ///
    /// Tasks run under a child of `shutdown`. A run-fatal outcome cancels
    /// that child, which stops every in-flight task, lets the current batch
    /// drain and marks all unstarted spaces `NotAttempted`. A fired
    /// `shutdown` does the same and sets [`RunReport::interrupted`].
    pub async fn run(&self, spaces: Vec<Space>, shutdown: &CancelSignal) -> RunReport {
        let started = Instant::now();
        let tracker = &self.ctx.tracker;
        tracker.enqueue(spaces.len() as u64);

        let order: HashMap<SpaceKey, usize> = spaces
            .iter()
            .enumerate()
            .map(|(i, space)| (space.key.clone(), i))
            .collect();

        let mut report = RunReport::default();
        let mut pending = Vec::with_capacity(spaces.len());
        for space in spaces {
            match self.ctx.cache.valid_entry(&space.key) {
                Some(entry) => {
                    tracing::info!(
                        space_key = %space.key,
                        file = %entry.file_path.display(),
                        "Skipping space with valid cached export"
                    );
                    tracker.record_cached(&space.key);
                    let outcome = TaskOutcome::cached(&entry);
                    report.totals.record(&outcome);
                    report.outcomes.push(outcome);
                }
                None => pending.push(space),
            }
        }

        let run_cancel = shutdown.child();

        let batches = partition(pending, self.batch_size);
        report.batches = batches.len();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            if run_cancel.is_cancelled() {
                for space in batch {
                    tracker.record_not_attempted(&space.key);
                    let outcome = TaskOutcome::not_attempted(space.key);
                    report.totals.record(&outcome);
                    report.outcomes.push(outcome);
                }
                continue;
            }

            log_batch_processing!(index + 1, batch_count, batch.len());

            let mut batch_result = BatchResult::new();
            let mut running = stream::iter(batch.into_iter().map(|space| {
                let task = ExportTask::new(&space, Arc::clone(&self.ctx));
                let cancel = run_cancel.clone();
                async move { task.run(&cancel).await }
            }))
            .buffer_unordered(self.max_concurrent);

            while let Some(outcome) = running.next().await {
                if outcome.is_run_fatal() && report.fatal_error.is_none() {
                    tracing::error!(
                        space_key = %outcome.space_key,
                        error = ?outcome.error,
                        "Run-fatal error, stopping remaining exports"
                    );
                    report.fatal_error = outcome.error.clone();
                    run_cancel.cancel();
                }
                batch_result.record(&outcome);
                report.outcomes.push(outcome);
            }

            tracing::debug!(
                batch = index + 1,
                completed = batch_result.completed,
                failed = batch_result.failed,
                aborted = batch_result.aborted,
                "Batch finished"
            );
            report.totals.merge(&batch_result);
        }

        report
            .outcomes
            .sort_by_key(|o| order.get(&o.space_key).copied().unwrap_or(usize::MAX));
        report.interrupted = shutdown.is_cancelled();
        report.duration = started.elapsed();
        report
    }
}
