//! # Task Execution
//!
//! Fire-and-forget units of work with completion accounting.
//!
//! ```text
//! spawn(job) ──► [queue] ──► worker 0 ─┐
//!                        ──► worker 1 ─┼──► completed += 1 ──► notify wait_idle()
//!                        ──► worker N ─┘
//! ```
//!
//! Two implementations:
//! - [`WorkerPool`]: fixed-size pool of OS threads (production)
//! - [`ManualExecutor`]: runs queued jobs only when pumped (deterministic tests)

mod manual;
mod pool;

pub use manual::ManualExecutor;
pub use pool::WorkerPool;

/// A unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs [`Job`]s and counts them.
pub trait Executor: Send + Sync {
    /// Schedules a job. Never blocks on the job itself.
    fn spawn(&self, name: &'static str, job: Job);

    /// Total number of jobs ever scheduled.
    fn scheduled(&self) -> u64;

    /// Total number of jobs that ran to completion.
    fn completed(&self) -> u64;

    /// Jobs scheduled but not yet completed.
    fn pending(&self) -> u64 {
        self.scheduled().saturating_sub(self.completed())
    }

    /// Blocks until every scheduled job has completed.
    fn wait_idle(&self);
}
