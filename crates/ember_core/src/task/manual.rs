//! Executor that only runs work when pumped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{Executor, Job};

/// Queues jobs and runs them on whichever thread calls [`pump`](Self::pump).
///
/// Useful when a test needs to observe the "scheduled but not yet run"
/// state, or to run a frame loop without worker threads.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<(&'static str, Job)>>,
    scheduled: AtomicU64,
    completed: AtomicU64,
}

impl ManualExecutor {
    /// Creates an empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the oldest queued job. Returns `false` if the queue was empty.
    pub fn pump_one(&self) -> bool {
        // Pop under the lock, run outside it: jobs may spawn more jobs.
        let next = self.queue.lock().pop_front();
        match next {
            Some((name, job)) => {
                tracing::trace!("Pumping task \"{}\"", name);
                job();
                self.completed.fetch_add(1, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    /// Runs jobs until the queue is empty, including jobs spawned while
    /// pumping. Returns how many ran.
    pub fn pump(&self) -> usize {
        let mut ran = 0;
        while self.pump_one() {
            ran += 1;
        }
        ran
    }

    /// Number of jobs waiting to be pumped.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Executor for ManualExecutor {
    fn spawn(&self, name: &'static str, job: Job) {
        self.scheduled.fetch_add(1, Ordering::AcqRel);
        self.queue.lock().push_back((name, job));
    }

    fn scheduled(&self) -> u64 {
        self.scheduled.load(Ordering::Acquire)
    }

    fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn wait_idle(&self) {
        self.pump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_jobs_wait_for_pump() {
        let executor = ManualExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        executor.spawn(
            "count",
            Box::new(move || {
                c.fetch_add(1, Ordering::Relaxed);
            }),
        );

        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert_eq!(executor.queued(), 1);
        assert_eq!(executor.pending(), 1);

        assert_eq!(executor.pump(), 1);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_pump_runs_nested_spawns() {
        let executor = Arc::new(ManualExecutor::new());
        let inner = Arc::clone(&executor);
        executor.spawn(
            "outer",
            Box::new(move || {
                inner.spawn("inner", Box::new(|| {}));
            }),
        );

        assert_eq!(executor.pump(), 2);
        assert_eq!(executor.scheduled(), 2);
        assert!(!executor.pump_one());
    }
}
