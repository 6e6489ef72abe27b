//! # Resource Cache
//!
//! Content-addressed, reference-counted, asynchronously loaded resources.
//!
//! ## Lifecycle
//!
//! ```text
//!  load(params) ──► identity = hash(kind, params)
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼ hit                     ▼ miss
//!   clone existing handle     insert entry (Loading)
//!                                    │
//!                    ┌───────────────┴───────────────┐
//!                    ▼ NonBlocking                   ▼ Blocking
//!            executor.spawn(load body)       run load body inline
//!                    │                               │
//!                    └──────► payload set ◄──────────┘
//!                                 │
//!                     status.store(Loaded | Failed, Release)
//!                                 │
//!                         notify waiters
//!
//!  update() once per tick: evict entries only the cache still references
//! ```
//!
//! ## Concurrency
//!
//! - The per-type map lock is held only for lookup / insert / erase.
//! - Readers never lock: `is_ready()` is a single `Acquire` load.
//! - Blocking waiters park on a condvar only after seeing "not ready".

mod cache;
mod cached;
mod identity;
mod loader;
mod source;

use std::fmt::Debug;
use std::hash::Hash;

pub use cache::{Lookup, ResourceCache};
pub use cached::{CachedResource, Handle, ResourceStatus};
pub use identity::{Fnv1aHasher, ResourceIdentity};
pub use loader::{LoadContext, LoadMode, LoaderStats, ResourceLoader};
pub use source::{AssetSource, FileSystemSource, MemorySource};

use crate::error::LoadError;

/// Typed construction parameters of a resource.
///
/// Equal parameters must hash equally: the hash is the cache key.
pub trait ResourceParams: Hash + Clone + Debug + Send + Sync + 'static {
    /// Path the raw bytes are read from, relative to the asset source.
    fn source_path(&self) -> &str;

    /// Human-readable name for logs.
    fn display_name(&self) -> String {
        self.source_path().to_owned()
    }
}

/// A type that can live in the resource cache.
///
/// `decode` is the only per-type customisation point of the load path.
pub trait Resource: Sized + Send + Sync + 'static {
    /// Construction parameters, hashed into the identity.
    type Params: ResourceParams;

    /// Short kind name, mixed into the identity and used in logs.
    const KIND: &'static str;

    /// Turns raw bytes into a payload.
    ///
    /// `ctx` can load other resources this one depends on.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the bytes are not a valid payload.
    fn decode(params: &Self::Params, bytes: &[u8], ctx: &LoadContext<'_>) -> Result<Self, LoadError>;

    /// Payload stored in place of a failed load. Should look obviously wrong.
    fn placeholder() -> Self;
}
