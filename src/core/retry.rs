//! Retry policy with exponential backoff
//!
//! [`RetryPolicy::decide`] classifies a failure and computes the next delay:
//!
//! ```text
//! delay = min(max_delay, base * multiplier^(attempt - 1) * (1 + jitter))
//! ```
//!
//! with `jitter` uniform in `[0, 1)` when enabled. Rate-limit failures start
//! from `base * rate_limit_multiplier` and never wait less than the server's
//! `Retry-After`.
//!
//! # Example
//!
//! ```
//! use confluence_export::core::retry::{RetryDecision, RetryPolicy};
//! use confluence_export::domain::ExportError;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default().without_jitter();
//! let err = ExportError::Transient("HTTP 503".to_string());
//!
//! assert_eq!(policy.decide(&err, 1), RetryDecision::Retry(Duration::from_secs(5)));
//! assert_eq!(policy.decide(&err, 2), RetryDecision::Retry(Duration::from_secs(10)));
//! assert_eq!(policy.decide(&err, 4), RetryDecision::GiveUp);
//! ```

use crate::config::RetryConfig;
use crate::core::cancel::CancelSignal;
use crate::domain::{ExportError, ExportJob};
use crate::log_retry_attempt;
use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Outcome of consulting the retry policy after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the given delay
    Retry(Duration),
    /// Stop retrying and surface the error
    GiveUp,
}

/// Backoff parameters shared by every network phase
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the first failure
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub rate_limit_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            rate_limit_multiplier: 4.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            rate_limit_multiplier: config.rate_limit_multiplier,
            jitter: config.jitter,
        }
    }

    /// Disables jitter, making delays deterministic
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Decides whether failure number `attempt` (1-based) should be retried
    pub fn decide(&self, error: &ExportError, attempt: u32) -> RetryDecision {
        if !error.is_retryable() || attempt > self.max_attempts {
            return RetryDecision::GiveUp;
        }

        match error {
            ExportError::RateLimited { retry_after, .. } => {
                let base = self.base_delay.as_secs_f64() * self.rate_limit_multiplier;
                let delay = self.compute_delay(base, attempt);
                RetryDecision::Retry(retry_after.map_or(delay, |after| after.max(delay)))
            }
            _ => RetryDecision::Retry(self.compute_delay(self.base_delay.as_secs_f64(), attempt)),
        }
    }

    fn compute_delay(&self, base_secs: f64, attempt: u32) -> Duration {
        let exponent = attempt.max(1).saturating_sub(1).min(i32::MAX as u32) as i32;
        let mut secs = base_secs * self.backoff_multiplier.powi(exponent);
        if self.jitter {
            secs = add_jitter(secs);
        }
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// Records a failure on `job` and waits out the backoff
    ///
    /// Increments the job's attempt counter and stores the error. Returns the
    /// error back when the policy gives up, or `Cancelled` if the run stops
    /// during the wait.
    pub async fn backoff(
        &self,
        job: &mut ExportJob,
        error: ExportError,
        cancel: &CancelSignal,
    ) -> Result<(), ExportError> {
        job.attempt_count += 1;
        job.last_error = Some(error.to_string());

        match self.decide(&error, job.attempt_count) {
            RetryDecision::GiveUp => {
                job.next_retry_at = None;
                Err(error)
            }
            RetryDecision::Retry(delay) => {
                job.next_retry_at = chrono::Duration::from_std(delay)
                    .ok()
                    .map(|d| Utc::now() + d);
                log_retry_attempt!(job.attempt_count, self.max_attempts, error);
                tracing::debug!(
                    space_key = %job.space_key,
                    state = %job.state(),
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                cancel.sleep(delay).await
            }
        }
    }

    /// Runs `operation` until it succeeds or the policy gives up
    ///
    /// Used for calls that are not tied to a single job, such as listing
    /// spaces.
    pub async fn run<F, Fut, T>(
        &self,
        what: &str,
        cancel: &CancelSignal,
        mut operation: F,
    ) -> Result<T, ExportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExportError>>,
    {
        let mut attempt = 0;
        loop {
            match cancel.guard(operation()).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;
                    match self.decide(&error, attempt) {
                        RetryDecision::GiveUp => return Err(error),
                        RetryDecision::Retry(delay) => {
                            tracing::warn!(
                                operation = what,
                                attempt = attempt,
                                max_attempts = self.max_attempts,
                                delay_ms = delay.as_millis() as u64,
                                error = %error,
                                "Retrying operation"
                            );
                            cancel.sleep(delay).await?;
                        }
                    }
                }
            }
        }
    }
}

/// Scales `secs` by a random factor in `[1, 2)`
fn add_jitter(secs: f64) -> f64 {
    let factor: f64 = rand::thread_rng().gen_range(0.0..1.0);
    secs * (1.0 + factor)
}
