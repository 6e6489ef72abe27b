//! Fixed-size worker pool.

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use parking_lot::{Condvar, Mutex};

use super::{Executor, Job};

/// A queued job with its name, kept for diagnostics.
struct Task {
    name: &'static str,
    job: Job,
}

/// Completion accounting shared by the pool and its workers.
struct Counters {
    scheduled: AtomicU64,
    completed: AtomicU64,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl Counters {
    fn finish(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
        // Notify under the lock so a waiter between its check and its wait
        // cannot miss the wake-up.
        let _guard = self.idle_lock.lock();
        self.idle.notify_all();
    }

    fn is_idle(&self) -> bool {
        self.completed.load(Ordering::Acquire) >= self.scheduled.load(Ordering::Acquire)
    }
}

/// Fixed-size pool of worker threads.
///
/// Jobs are distributed through a lock-free MPMC queue. Dropping the pool
/// closes the queue; workers drain what is left and are joined.
///
/// # Example
///
/// ```rust,ignore
/// let pool = WorkerPool::new(4)?;
/// pool.spawn("decode", Box::new(|| decode_texture()));
/// pool.wait_idle();
/// ```
pub struct WorkerPool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Spawns `threads` workers (at least one).
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be spawned.
    pub fn new(threads: usize) -> io::Result<Self> {
        let threads = threads.max(1);
        let (sender, receiver) = unbounded::<Task>();
        let counters = Arc::new(Counters {
            scheduled: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let receiver = receiver.clone();
            let counters = Arc::clone(&counters);
            let handle = thread::Builder::new()
                .name(format!("ember-worker-{index}"))
                .spawn(move || worker_loop(&receiver, &counters))?;
            workers.push(handle);
        }

        tracing::debug!("Worker pool started with {} threads", threads);

        Ok(Self {
            sender: Some(sender),
            workers,
            counters,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(receiver: &Receiver<Task>, counters: &Counters) {
    for task in receiver {
        tracing::trace!("Running task \"{}\"", task.name);
        let job = task.job;
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("Task \"{}\" panicked", task.name);
        }
        counters.finish();
    }
}

impl Executor for WorkerPool {
    fn spawn(&self, name: &'static str, job: Job) {
        self.counters.scheduled.fetch_add(1, Ordering::AcqRel);
        let task = Task { name, job };
        let rejected = match &self.sender {
            Some(sender) => sender.send(task).err().map(SendError::into_inner),
            None => Some(task),
        };

        // Every worker is gone; run on the caller rather than lose the job.
        if let Some(task) = rejected {
            tracing::warn!("Worker pool closed, running \"{}\" inline", task.name);
            (task.job)();
            self.counters.finish();
        }
    }

    fn scheduled(&self) -> u64 {
        self.counters.scheduled.load(Ordering::Acquire)
    }

    fn completed(&self) -> u64 {
        self.counters.completed.load(Ordering::Acquire)
    }

    fn wait_idle(&self) {
        let mut guard = self.counters.idle_lock.lock();
        while !self.counters.is_idle() {
            self.counters.idle.wait(&mut guard);
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.workers.len())
            .field("scheduled", &self.scheduled())
            .field("completed", &self.completed())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue ends every worker loop once it is drained.
        self.sender.take();
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // The last owner may be a job running on one of our own workers.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked during shutdown");
            }
        }
    }
}
