//! Graphics-thread side of the frame pipeline.
//!
//! - [`FrameData`] is the snapshot the main thread writes into a slot
//! - [`RenderThread`] consumes sealed slots and drives a [`RenderBackend`]
//! - [`GpuTimingRing`] reads frame timings back one frame late
//! - [`HeadlessBackend`] stands in for a GPU

mod backend;
mod frame;
mod headless;
mod render_thread;
mod stats;
mod timing;

pub use backend::RenderBackend;
pub use frame::{FrameData, FrameFlags, RenderConfig, UiCommand, Viewport};
pub use headless::{BackendCall, CallLog, HeadlessBackend};
pub use render_thread::{RenderStage, RenderThread, RENDER_THREAD_NAME};
pub use stats::RenderStats;
pub use timing::{FrameTiming, GpuTimingRing};
