//! Batch partitioning and per-batch results
//!
//! Spaces are split into ordered, non-overlapping batches. Batches run one
//! after another; tasks within a batch run concurrently.

use super::task::{TaskOutcome, TaskStatus};

/// Splits `items` into consecutive batches of at most `batch_size`
///
/// A `batch_size` of 0 yields a single batch holding everything. An empty
/// input yields no batches.
///
/// # Examples
///
/// ```
/// use confluence_export::core::export::batch::partition;
///
/// let batches = partition(vec![1, 2, 3, 4, 5], 2);
/// assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
///
/// assert_eq!(partition(vec![1, 2, 3], 0), vec![vec![1, 2, 3]]);
/// ```
pub fn partition<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    if batch_size == 0 || batch_size >= items.len() {
        return vec![items];
    }

    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Tally of task outcomes for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub completed: usize,
    pub cached: usize,
    pub failed: usize,
    pub aborted: usize,
    pub not_attempted: usize,
    pub bytes: u64,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &TaskOutcome) {
        match outcome.status {
            TaskStatus::Completed => {
                self.completed += 1;
                self.bytes += outcome.bytes;
            }
            TaskStatus::Cached => self.cached += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Aborted => self.aborted += 1,
            TaskStatus::NotAttempted => self.not_attempted += 1,
        }
    }

    /// Merge another batch result into this one
    pub fn merge(&mut self, other: &BatchResult) {
        self.completed += other.completed;
        self.cached += other.cached;
        self.failed += other.failed;
        self.aborted += other.aborted;
        self.not_attempted += other.not_attempted;
        self.bytes += other.bytes;
    }

    pub fn total(&self) -> usize {
        self.completed + self.cached + self.failed + self.aborted + self.not_attempted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpaceKey;

    #[test]
    fn test_partition_covers_input_in_order() {
        let items: Vec<u32> = (0..23).collect();
        let batches = partition(items.clone(), 5);

        assert_eq!(batches.len(), 5);
        assert!(batches.iter().all(|b| b.len() <= 5));
        assert_eq!(batches[4], vec![20, 21, 22]);
        let flattened: Vec<u32> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }

    #[test]
    fn test_partition_exact_multiple() {
        let batches = partition((0..10).collect::<Vec<_>>(), 5);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_partition_empty_and_unbounded() {
        assert!(partition(Vec::<u8>::new(), 3).is_empty());
        assert!(partition(Vec::<u8>::new(), 0).is_empty());
        assert_eq!(partition(vec![1, 2, 3], 0).len(), 1);
        assert_eq!(partition(vec![1, 2, 3], 10).len(), 1);
    }

    #[test]
    fn test_batch_result_record_and_merge() {
        let key = SpaceKey::new("ENG").unwrap();
        let mut first = BatchResult::new();
        first.record(&TaskOutcome {
            bytes: 100,
            ..TaskOutcome::not_attempted(key.clone())
        });
        first.record(&TaskOutcome {
            status: TaskStatus::Completed,
            bytes: 100,
            ..TaskOutcome::not_attempted(key)
        });

        let mut total = BatchResult::new();
        total.merge(&first);
        total.merge(&first);

        assert_eq!(total.completed, 2);
        assert_eq!(total.not_attempted, 2);
        assert_eq!(total.bytes, 200);
        assert_eq!(total.total(), 4);
    }
}
