//! Rayon worker pool and seed-range batching for Monte Carlo runs.

use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};

/// Number of worker threads a run uses. `0` means the global Rayon pool
/// (one thread per core).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerPool {
    pub workers: usize,
}

impl WorkerPool {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    /// Threads work will actually be spread over.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            rayon::current_num_threads()
        } else {
            self.workers
        }
    }

    /// Runs `f` inside this pool. A dedicated pool is only built when a
    /// worker count was set.
    pub fn install<F, R>(&self, f: F) -> Result<R, ThreadPoolBuildError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            return Ok(f());
        }
        let pool = ThreadPoolBuilder::new().num_threads(self.workers).build()?;
        Ok(pool.install(f))
    }
}

/// Splits `total` items into up to `num_batches` ranges `[start, end)` of
/// near-equal size, larger ones first.
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;

    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for batch in 0..num_batches {
        let end = start + base + usize::from(batch < remainder);
        ranges.push((start, end));
        start = end;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_ranges_cover_every_item_once() {
        let test_cases = vec![
            (100, 4, vec![(0, 25), (25, 50), (50, 75), (75, 100)]),
            (10, 3, vec![(0, 4), (4, 7), (7, 10)]),
            (3, 10, vec![(0, 1), (1, 2), (2, 3)]),
            (7, 1, vec![(0, 7)]),
        ];

        for (total, batches, expected) in test_cases {
            assert_eq!(batch_ranges(total, batches), expected, "{total} in {batches}");
        }
    }

    #[test]
    fn batch_ranges_empty_when_nothing_to_split() {
        assert!(batch_ranges(0, 5).is_empty());
        assert!(batch_ranges(10, 0).is_empty());
    }

    #[test]
    fn install_runs_on_requested_thread_count() {
        let pool = WorkerPool::with_workers(2);
        let threads = pool.install(rayon::current_num_threads).unwrap();
        assert_eq!(threads, 2);
        assert_eq!(pool.effective_workers(), 2);
    }

    #[test]
    fn default_pool_runs_inline() {
        let pool = WorkerPool::default();
        assert_eq!(pool.install(|| 40 + 2).unwrap(), 42);
        assert!(pool.effective_workers() >= 1);
    }
}
