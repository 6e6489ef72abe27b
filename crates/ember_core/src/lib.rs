//! # EMBER Core Engine
//!
//! The concurrency core of the engine:
//! - Asynchronous, content-addressed resource cache
//! - Fixed-size worker pool for resource loads
//! - Double-buffered simulation → render frame hand-off
//!
//! ## Architecture Rules
//!
//! 1. **No locks on the read path** - readiness is a single atomic flag
//! 2. **One load per identity** - concurrent requests coalesce onto one entry
//! 3. **No slot is written while being read** - enforced by two semaphores
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_core::{LoadMode, ResourceLoader, WorkerPool, MemorySource};
//!
//! let loader = ResourceLoader::new(Arc::new(WorkerPool::new(4)?), Arc::new(MemorySource::new()));
//! let texture = loader.load::<Texture>(params, LoadMode::NonBlocking);
//! // ... later, on any thread
//! if let Some(pixels) = texture.get() { /* draw */ }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod resource;
pub mod sync;
pub mod task;

pub use error::{LoadError, LoadResult, PipelineError};
pub use resource::{
    AssetSource, CachedResource, FileSystemSource, Handle, LoadContext, LoadMode, LoaderStats,
    MemorySource, Resource, ResourceCache, ResourceIdentity, ResourceLoader, ResourceParams,
    ResourceStatus,
};
pub use sync::{
    frame_pipeline, frame_pipeline_with, FrameConsumer, FrameProducer, SealedFrame, SlotState,
};
pub use task::{Executor, Job, ManualExecutor, WorkerPool};
