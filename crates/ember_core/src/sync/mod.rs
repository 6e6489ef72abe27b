//! # Frame Hand-off
//!
//! Double-buffered simulation → render hand-off driven by two semaphores.
//!
//! ## The Problem
//!
//! ```text
//! Main thread:      copy frame N+1 into a slot
//! Graphics thread:  read frame N from a slot
//!
//! Same slot:        TORN FRAME
//! Mutex per slot:   render thread blocks on simulation locks
//! ```
//!
//! ## The Solution
//!
//! ```text
//!               main_to_graphics (sealed permits, starts at 0)
//!   ┌──────┐  ─────────────────────────────────────────►  ┌──────────┐
//!   │ Main │        slot[n % 2]      slot[(n+1) % 2]       │ Graphics │
//!   └──────┘  ◄─────────────────────────────────────────   └──────────┘
//!               graphics_to_main (free permits, starts at 2)
//! ```
//!
//! The main thread takes a free permit before writing and releases a sealed
//! permit after; the graphics thread does the opposite. Each slot also
//! carries an atomic state, so a protocol violation panics instead of
//! tearing a frame.

mod double_buffer;
mod frame_pipeline;
mod semaphore;

pub use double_buffer::{SlotState, SLOT_COUNT};
pub use frame_pipeline::{frame_pipeline, frame_pipeline_with, FrameConsumer, FrameProducer, SealedFrame};
