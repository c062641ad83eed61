//! Export job status polling

use crate::adapters::confluence::{ExportService, PollStatus, ReadyExport};
use crate::core::cancel::{with_timeout, CancelSignal};
use crate::core::pool::ConnectionPool;
use crate::core::retry::RetryPolicy;
use crate::domain::{ExportError, ExportJob};
use std::sync::Arc;
use std::time::Duration;

/// Waits for a submitted export job to produce its archive
///
/// Sleeps `poll_interval` before every query and holds a pool lease only
/// while a query is in flight. Failed queries are retried under the
/// policy; the job's attempt counter resets after every successful query.
#[derive(Clone)]
pub struct JobPoller {
    service: Arc<dyn ExportService>,
    pool: ConnectionPool,
    policy: RetryPolicy,
    poll_interval: Duration,
    timeout: Duration,
}

impl JobPoller {
    pub fn new(
        service: Arc<dyn ExportService>,
        pool: ConnectionPool,
        policy: RetryPolicy,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            pool,
            policy,
            poll_interval,
            timeout,
        }
    }

    /// Polls `job` until the remote reports it ready
    ///
    /// # Errors
    ///
    /// `JobFailed` as soon as the remote reports failure, `Cancelled` on
    /// shutdown, or the last query error once retries are exhausted.
    pub async fn poll_until_ready(
        &self,
        job: &mut ExportJob,
        cancel: &CancelSignal,
    ) -> Result<ReadyExport, ExportError> {
        let job_id = job
            .job_id
            .clone()
            .ok_or_else(|| ExportError::JobFailed("Job was never submitted".to_string()))?;

        loop {
            cancel.sleep(self.poll_interval).await?;

            let status = {
                let _lease = self.pool.acquire(cancel).await?;
                cancel
                    .guard(with_timeout(
                        self.timeout,
                        "status query",
                        self.service.poll_export(&job_id),
                    ))
                    .await
            };

            match status {
                Ok(PollStatus::Pending { percent }) => {
                    job.attempt_count = 0;
                    tracing::debug!(
                        space_key = %job.space_key,
                        job_id = %job_id,
                        percent = ?percent,
                        "Export still running"
                    );
                }
                Ok(PollStatus::Ready(ready)) => {
                    tracing::info!(
                        space_key = %job.space_key,
                        job_id = %job_id,
                        expected_size = ?ready.expected_size,
                        "Export ready for download"
                    );
                    return Ok(ready);
                }
                Ok(PollStatus::Failed(reason)) => {
                    tracing::warn!(
                        space_key = %job.space_key,
                        job_id = %job_id,
                        reason = %reason,
                        "Remote export job failed"
                    );
                    return Err(ExportError::JobFailed(reason));
                }
                Err(ExportError::Cancelled) => return Err(ExportError::Cancelled),
                Err(error) => self.policy.backoff(job, error, cancel).await?,
            }
        }
    }
}
