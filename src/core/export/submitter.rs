//! Export job submission
//!
//! Callers wait their turn on the shared [`SubmissionThrottle`] through
//! [`JobSubmitter::wait_turn`] before each submission. A submission takes a
//! pool lease for the duration of the call.

use crate::adapters::confluence::ExportService;
use crate::core::cancel::{with_timeout, CancelSignal};
use crate::core::pool::ConnectionPool;
use crate::domain::{ExportError, ExportFormat, JobId, SpaceKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between submissions across all tasks
#[derive(Debug)]
pub struct SubmissionThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl SubmissionThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Waits until `interval` has passed since the previous submission
    ///
    /// Callers are admitted one at a time in lock order.
    pub async fn wait_turn(&self, cancel: &CancelSignal) -> Result<(), ExportError> {
        if self.interval.is_zero() {
            return Ok(());
        }

        let mut last = cancel.guard(async { Ok(self.last.lock().await) }).await?;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            let now = Instant::now();
            if ready_at > now {
                cancel.sleep(ready_at - now).await?;
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }
}

/// Starts remote export jobs
#[derive(Clone)]
pub struct JobSubmitter {
    service: Arc<dyn ExportService>,
    pool: ConnectionPool,
    throttle: Arc<SubmissionThrottle>,
    format: ExportFormat,
    timeout: Duration,
}

impl JobSubmitter {
    pub fn new(
        service: Arc<dyn ExportService>,
        pool: ConnectionPool,
        throttle: Arc<SubmissionThrottle>,
        format: ExportFormat,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            pool,
            throttle,
            format,
            timeout,
        }
    }

    /// Waits until the next submission may start
    pub async fn wait_turn(&self, cancel: &CancelSignal) -> Result<(), ExportError> {
        self.throttle.wait_turn(cancel).await
    }

    /// Submits one export request for `space_key`
    ///
    /// Does not wait on the throttle; call [`JobSubmitter::wait_turn`] first.
    pub async fn submit(
        &self,
        space_key: &SpaceKey,
        cancel: &CancelSignal,
    ) -> Result<JobId, ExportError> {
        let _lease = self.pool.acquire(cancel).await?;

        let job_id = cancel
            .guard(with_timeout(
                self.timeout,
                "export submission",
                self.service.submit_export(space_key, self.format),
            ))
            .await?;

        tracing::info!(
            space_key = %space_key,
            job_id = %job_id,
            format = %self.format,
            "Export job submitted"
        );
        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_throttle_spaces_submissions() {
        let throttle = SubmissionThrottle::new(Duration::from_millis(40));
        let cancel = CancelSignal::never();

        let start = Instant::now();
        for _ in 0..3 {
            throttle.wait_turn(&cancel).await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_turn() {
        let throttle = SubmissionThrottle::new(Duration::from_secs(30));
        let cancel = CancelSignal::never();
        throttle.wait_turn(&cancel).await.unwrap();

        let waiter = {
            let cancel = cancel.clone();
            let throttle = Arc::new(throttle);
            tokio::spawn(async move { throttle.wait_turn(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(ExportError::Cancelled));
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_wait() {
        let throttle = SubmissionThrottle::new(Duration::ZERO);
        let cancel = CancelSignal::never();

        let start = Instant::now();
        for _ in 0..10 {
            throttle.wait_turn(&cancel).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
