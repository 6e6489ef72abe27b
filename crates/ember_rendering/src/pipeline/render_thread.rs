//! # Render Thread
//!
//! The graphics thread consumes sealed frames from the pipeline and drives
//! a [`RenderBackend`]. It never touches the render world or the resource
//! cache directly: everything it needs is in the [`FrameData`] snapshot.
//!
//! ```text
//!   Initialization ──► Running ──► Cleanup ──► Terminated
//!        │                │
//!        │                └─ per sealed frame:
//!        │                     resize? → collect timing → visibility (main + cascades)
//!        │                     → shadows → opaque → ui? → present → release slot
//!        └─ backend.initialize()
//! ```
//!
//! A frame with `flags.shutdown` set is released without being drawn and
//! ends the loop.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ember_core::FrameConsumer;
use parking_lot::{Condvar, Mutex};

use crate::culling::{VisibilityFilter, VisibilityFrustum, CASCADE_COUNT};
use crate::error::{BackendError, RenderThreadError};

use super::backend::RenderBackend;
use super::frame::FrameData;
use super::stats::RenderStats;
use super::timing::GpuTimingRing;

/// Name of the graphics thread.
pub const RENDER_THREAD_NAME: &str = "ember-graphics";

/// Lifecycle stage of the render thread. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderStage {
    /// Creating device resources.
    Initialization,
    /// Consuming frames.
    Running,
    /// Releasing device resources.
    Cleanup,
    /// The thread is about to exit.
    Terminated,
}

/// Current stage plus a condvar to wait on changes.
struct StageTracker {
    stage: Mutex<RenderStage>,
    changed: Condvar,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: Mutex::new(RenderStage::Initialization),
            changed: Condvar::new(),
        }
    }

    fn get(&self) -> RenderStage {
        *self.stage.lock()
    }

    fn set(&self, stage: RenderStage) {
        let mut current = self.stage.lock();
        if *current < stage {
            tracing::debug!("Render stage {:?} -> {:?}", *current, stage);
            *current = stage;
            self.changed.notify_all();
        }
    }

    fn wait_for(&self, stage: RenderStage) {
        let mut current = self.stage.lock();
        while *current < stage {
            self.changed.wait(&mut current);
        }
    }

    fn wait_for_until(&self, stage: RenderStage, deadline: Instant) -> bool {
        let mut current = self.stage.lock();
        while *current < stage {
            if self.changed.wait_until(&mut current, deadline).timed_out() {
                return *current >= stage;
            }
        }
        true
    }
}

/// Marks the thread terminated however it exits, panics included.
struct TerminateOnExit<'a>(&'a StageTracker);

impl Drop for TerminateOnExit<'_> {
    fn drop(&mut self) {
        self.0.set(RenderStage::Terminated);
    }
}

/// Handle to the running graphics thread.
pub struct RenderThread {
    handle: JoinHandle<Result<RenderStats, BackendError>>,
    tracker: Arc<StageTracker>,
    stats: Arc<Mutex<RenderStats>>,
}

impl RenderThread {
    /// Starts the graphics thread consuming `frames` with `backend`.
    ///
    /// # Errors
    ///
    /// [`RenderThreadError::Spawn`] if the OS cannot start the thread.
    pub fn spawn<B: RenderBackend>(
        backend: B,
        frames: FrameConsumer<FrameData>,
    ) -> Result<Self, RenderThreadError> {
        let tracker = Arc::new(StageTracker::new());
        let stats = Arc::new(Mutex::new(RenderStats::default()));

        let thread_tracker = Arc::clone(&tracker);
        let thread_stats = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_owned())
            .spawn(move || graphics_main(backend, frames, &thread_tracker, &thread_stats))?;

        Ok(Self {
            handle,
            tracker,
            stats,
        })
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> RenderStage {
        self.tracker.get()
    }

    /// Blocks until the thread has reached `stage` or any later stage.
    pub fn wait_for_stage(&self, stage: RenderStage) {
        self.tracker.wait_for(stage);
    }

    /// Like [`wait_for_stage`](Self::wait_for_stage) with a timeout.
    /// Returns whether the stage was reached.
    #[must_use]
    pub fn wait_for_stage_timeout(&self, stage: RenderStage, timeout: Duration) -> bool {
        self.tracker.wait_for_until(stage, Instant::now() + timeout)
    }

    /// Statistics as of the last frame the thread published.
    ///
    /// The thread skips publishing while this lock is held elsewhere, so
    /// the snapshot may trail by a frame. [`join`](Self::join) returns the
    /// exact totals.
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        *self.stats.lock()
    }

    /// Returns true once the thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread to exit and returns its final statistics.
    ///
    /// The thread only exits after a shutdown frame, a backend error, or
    /// once the producer is dropped.
    ///
    /// # Errors
    ///
    /// The backend error that stopped the thread, or
    /// [`RenderThreadError::Panicked`].
    pub fn join(self) -> Result<RenderStats, RenderThreadError> {
        match self.handle.join() {
            Ok(result) => result.map_err(RenderThreadError::from),
            Err(payload) => Err(RenderThreadError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for RenderThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderThread")
            .field("stage", &self.stage())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

fn graphics_main<B: RenderBackend>(
    mut backend: B,
    mut frames: FrameConsumer<FrameData>,
    tracker: &StageTracker,
    shared_stats: &Mutex<RenderStats>,
) -> Result<RenderStats, BackendError> {
    let _terminate = TerminateOnExit(tracker);
    tracing::info!("Render thread launched");

    let result = backend.initialize().and_then(|()| {
        tracker.set(RenderStage::Running);
        FrameRenderer::new(shared_stats).run(&mut backend, &mut frames)
    });

    tracker.set(RenderStage::Cleanup);
    backend.shutdown();
    // Unblocks a producer waiting for a free slot.
    drop(frames);

    match &result {
        Ok(stats) => tracing::info!("Render thread shut down after {} frames", stats.frames),
        Err(e) => tracing::error!("Render thread stopped: {}", e),
    }
    result
}

/// Per-thread render state, reused across frames.
struct FrameRenderer<'a> {
    visibility: VisibilityFilter,
    timing: GpuTimingRing,
    stats: RenderStats,
    shared_stats: &'a Mutex<RenderStats>,
}

impl<'a> FrameRenderer<'a> {
    fn new(shared_stats: &'a Mutex<RenderStats>) -> Self {
        Self {
            visibility: VisibilityFilter::new(),
            timing: GpuTimingRing::new(),
            stats: RenderStats::default(),
            shared_stats,
        }
    }

    fn run<B: RenderBackend>(
        mut self,
        backend: &mut B,
        frames: &mut FrameConsumer<FrameData>,
    ) -> Result<RenderStats, BackendError> {
        while let Some(frame) = frames.acquire_sealed_frame() {
            if frame.flags.shutdown {
                tracing::debug!("Shutdown frame {} received", frame.frame_number());
                break;
            }
            self.render(backend, &frame, frame.frame_number())?;
            // Never wait on a reader; a skipped copy is replaced next frame.
            if let Some(mut shared) = self.shared_stats.try_lock() {
                *shared = self.stats;
            }
            // Dropping the sealed frame frees the slot for the main thread.
        }
        Ok(self.stats)
    }

    fn render<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        frame: &FrameData,
        number: u64,
    ) -> Result<(), BackendError> {
        if frame.flags.recreate_swapchain {
            let [width, height] = frame.window_size;
            tracing::debug!("Recreating swapchain at {}x{}", width, height);
            backend.resize(width, height)?;
            self.stats.resizes += 1;
        }

        if self.timing.can_collect() {
            if let Some(mut timing) = self.timing.collect_previous(number) {
                timing.gpu = backend.gpu_time(timing.frame);
                self.stats.record_timing(&timing);
            }
        }
        self.timing.begin(number);

        self.visibility.run(
            &frame.frustums(),
            &frame.instances,
            frame.config.force_all_visible,
        );
        self.stats.last_visibility = self.visibility.stats();

        let mut draw_calls = 0;
        let mut shadow_draw_calls = 0;
        if frame.config.use_3d {
            if frame.shadows_enabled() {
                for cascade in 0..CASCADE_COUNT {
                    let visible = self.visibility.visible(VisibilityFrustum::cascade(cascade));
                    shadow_draw_calls += backend.shadow_pass(cascade, frame, visible)?;
                }
            }
            draw_calls += backend.opaque_pass(frame, self.visibility.visible(VisibilityFrustum::Main))?;
        }

        // The UI is laid out for the old size on a resize frame.
        let mut ui_commands = 0;
        if frame.config.use_2d && !frame.flags.recreate_swapchain {
            draw_calls += backend.ui_pass(frame)?;
            ui_commands = u32::try_from(frame.ui.len()).unwrap_or(u32::MAX);
        }

        backend.present(frame.flags.vsync)?;
        self.timing.end(number);
        self.stats
            .record_frame(draw_calls + shadow_draw_calls, shadow_draw_calls, ui_commands);
        Ok(())
    }
}
