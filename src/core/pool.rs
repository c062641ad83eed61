//! Bounded pool of network slots
//!
//! Every network call made on behalf of a job holds a [`Lease`] for its
//! duration. The pool hands out at most `max_concurrent` leases at a time;
//! waiters are served in FIFO order by the underlying semaphore.

use crate::core::cancel::CancelSignal;
use crate::domain::ExportError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Concurrency gate shared by all export tasks
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// One in-flight network operation
///
/// Dropping the lease frees the slot, whether the call succeeded, failed or
/// was cancelled.
#[derive(Debug)]
pub struct Lease {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConnectionPool {
    /// Creates a pool with `max_concurrent` slots (at least one)
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Waits for a free slot
    ///
    /// Returns `Cancelled` if the run is cancelled while waiting.
    pub async fn acquire(&self, cancel: &CancelSignal) -> Result<Lease, ExportError> {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let permit = tokio::select! {
            permit = self.slots.clone().acquire_owned() => {
                permit.map_err(|_| ExportError::Cancelled)?
            }
            _ = cancel.cancelled() => return Err(ExportError::Cancelled),
        };

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Lease {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Leases currently held
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of leases held at once since the pool was created
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}
