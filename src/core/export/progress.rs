//! Run progress tracking
//!
//! Tasks report their state transitions here; the tracker keeps atomic
//! counters and optionally drives an indicatif progress bar over spaces.

use crate::domain::{JobState, SpaceKey};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub queued: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub cached: u64,
    pub failed: u64,
    pub aborted: u64,
    pub not_attempted: u64,
    pub bytes_downloaded: u64,
    pub bytes_expected: u64,
}

impl ProgressSnapshot {
    /// Spaces that reached an outcome
    pub fn finished(&self) -> u64 {
        self.completed + self.cached + self.failed + self.aborted + self.not_attempted
    }
}

/// Observer of task state transitions
///
/// Safe to share across tasks; every method takes `&self`.
pub struct ProgressTracker {
    total: AtomicU64,
    queued: AtomicU64,
    in_flight: AtomicU64,
    completed: AtomicU64,
    cached: AtomicU64,
    failed: AtomicU64,
    aborted: AtomicU64,
    not_attempted: AtomicU64,
    bytes_downloaded: AtomicU64,
    bytes_expected: AtomicU64,
    start_time: Instant,
    bar: Option<ProgressBar>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ProgressTracker {
    /// Creates a tracker, with a terminal progress bar if `enable_bar`
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} spaces {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self {
            total: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            cached: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
            not_attempted: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
            bytes_expected: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Registers spaces about to be scheduled
    pub fn enqueue(&self, count: u64) {
        self.total.fetch_add(count, Ordering::Relaxed);
        self.queued.fetch_add(count, Ordering::Relaxed);
        if let Some(bar) = &self.bar {
            bar.inc_length(count);
        }
    }

    /// Records a state transition of one job
    pub fn observe(&self, space_key: &SpaceKey, from: JobState, to: JobState) {
        if from == to {
            return;
        }

        match to {
            JobState::Completed => {
                self.leave(from);
                self.completed.fetch_add(1, Ordering::Relaxed);
                self.advance(space_key, "completed");
            }
            JobState::Failed => {
                self.leave(from);
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.advance(space_key, "failed");
            }
            _ if from == JobState::Queued => {
                decrement(&self.queued);
                self.in_flight.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        if let Some(bar) = &self.bar {
            if !to.is_terminal() {
                bar.set_message(format!("{space_key} {to}"));
            }
        }
    }

    /// A queued space was satisfied from the cache
    pub fn record_cached(&self, space_key: &SpaceKey) {
        decrement(&self.queued);
        self.cached.fetch_add(1, Ordering::Relaxed);
        self.advance(space_key, "cached");
    }

    /// A task stopped by cancellation while in `from`
    pub fn record_aborted(&self, space_key: &SpaceKey, from: JobState) {
        self.leave(from);
        self.aborted.fetch_add(1, Ordering::Relaxed);
        self.advance(space_key, "aborted");
    }

    /// A queued space that was never started
    pub fn record_not_attempted(&self, space_key: &SpaceKey) {
        decrement(&self.queued);
        self.not_attempted.fetch_add(1, Ordering::Relaxed);
        self.advance(space_key, "not attempted");
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_expected(&self, bytes: u64) {
        self.bytes_expected.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            not_attempted: self.not_attempted.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            bytes_expected: self.bytes_expected.load(Ordering::Relaxed),
        }
    }

    /// Download throughput since the tracker was created, in bytes/sec
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.bytes_downloaded.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    fn leave(&self, from: JobState) {
        if from == JobState::Queued {
            decrement(&self.queued);
        } else {
            decrement(&self.in_flight);
        }
    }

    fn advance(&self, space_key: &SpaceKey, what: &str) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(format!("{space_key} {what}"));
        }
    }
}

fn decrement(counter: &AtomicU64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
}
