//! Run-wide cancellation signal
//!
//! Wraps a [`CancellationToken`] so export code can race any await point
//! against cancellation. A run derives a child signal from the shutdown
//! signal; cancelling the child stops the run without touching the parent.

use crate::domain::ExportError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cloneable handle on a cancellation token
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A signal nothing else holds, so it never fires
    pub fn never() -> Self {
        Self::default()
    }

    /// Signal that fires with this one, or on its own via [`CancelSignal::cancel`]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Cancels this signal and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Sleeps for `duration` unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<(), ExportError> {
        if self.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(ExportError::Cancelled),
        }
    }

    /// Runs `fut` to completion unless cancelled first
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, ExportError>
    where
        F: Future<Output = Result<T, ExportError>>,
    {
        if self.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ExportError::Cancelled),
            result = fut => result,
        }
    }
}

/// Bounds a network call by `timeout`; expiry is a [`ExportError::Transient`]
pub async fn with_timeout<F, T>(timeout: Duration, what: &str, fut: F) -> Result<T, ExportError>
where
    F: Future<Output = Result<T, ExportError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ExportError::Transient(format!(
            "{what} timed out after {}s",
            timeout.as_secs_f64()
        ))),
    }
}
