//! Cache entries and the handles that share them.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Condvar, Mutex};

use super::{Resource, ResourceIdentity, ResourceParams};
use crate::error::LoadError;

/// Load state of a cache entry.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceStatus {
    /// The load body has not finished.
    Loading = 0,
    /// The payload decoded successfully.
    Loaded = 1,
    /// The load failed; the payload is the type's placeholder.
    Failed = 2,
}

impl ResourceStatus {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loaded,
            2 => Self::Failed,
            _ => Self::Loading,
        }
    }

    /// `true` once the load finished, whether or not it succeeded.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        !matches!(self, Self::Loading)
    }
}

/// A payload plus its readiness flag, shared by every holder.
///
/// Single writer (the load body), any number of readers. The payload is
/// written before the status flips away from `Loading` with `Release`
/// ordering; readers load the status with `Acquire`, so a reader that
/// observes "ready" always observes the full payload.
pub struct CachedResource<T: Resource> {
    identity: ResourceIdentity,
    params: T::Params,
    status: AtomicU8,
    claimed: AtomicBool,
    payload: OnceLock<T>,
    error: OnceLock<LoadError>,
    ready_lock: Mutex<()>,
    ready_changed: Condvar,
}

impl<T: Resource> CachedResource<T> {
    /// Creates an entry in the `Loading` state.
    #[must_use]
    pub fn new(identity: ResourceIdentity, params: T::Params) -> Self {
        Self {
            identity,
            params,
            status: AtomicU8::new(ResourceStatus::Loading as u8),
            claimed: AtomicBool::new(false),
            payload: OnceLock::new(),
            error: OnceLock::new(),
            ready_lock: Mutex::new(()),
            ready_changed: Condvar::new(),
        }
    }

    /// Creates an entry that is already loaded.
    #[must_use]
    pub fn ready(identity: ResourceIdentity, params: T::Params, value: T) -> Self {
        let entry = Self::new(identity, params);
        entry.claimed.store(true, Ordering::Relaxed);
        entry.complete(Ok(value));
        entry
    }

    /// Cache key of this entry.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> ResourceIdentity {
        self.identity
    }

    /// Parameters the entry was requested with.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &T::Params {
        &self.params
    }

    /// Current load state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ResourceStatus {
        ResourceStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Claims the right to run the load body. Only the first caller wins.
    ///
    /// A blocking requester that finds a queued load claims and runs it
    /// inline instead of waiting on a worker that may never get to it.
    pub(crate) fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Publishes the outcome of the load body.
    ///
    /// A failure stores the error and the type's placeholder. Only the first
    /// call has any effect.
    pub fn complete(&self, result: Result<T, LoadError>) {
        if self.status().is_ready() {
            tracing::warn!("{} \"{}\" completed twice", T::KIND, self.params.display_name());
            return;
        }

        let status = match result {
            Ok(value) => {
                let _ = self.payload.set(value);
                ResourceStatus::Loaded
            }
            Err(err) => {
                let _ = self.error.set(err);
                let _ = self.payload.set(T::placeholder());
                ResourceStatus::Failed
            }
        };

        // Store under the wait lock: a waiter holding it has either not yet
        // checked the flag or is already parked on the condvar.
        let _guard = self.ready_lock.lock();
        self.status.store(status as u8, Ordering::Release);
        self.ready_changed.notify_all();
    }

    /// Payload, or `None` while loading.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        if self.status().is_ready() {
            self.payload.get()
        } else {
            None
        }
    }

    /// Blocks until the load finished, then returns the payload.
    ///
    /// The lock is only taken when the first check says "not ready".
    pub fn wait(&self) -> &T {
        if !self.status().is_ready() {
            let mut guard = self.ready_lock.lock();
            while !self.status().is_ready() {
                self.ready_changed.wait(&mut guard);
            }
        }

        match self.payload.get() {
            Some(value) => value,
            None => unreachable!("payload is set before readiness is published"),
        }
    }

    /// The load error, if the load failed.
    #[must_use]
    pub fn error(&self) -> Option<&LoadError> {
        if self.status() == ResourceStatus::Failed {
            self.error.get()
        } else {
            None
        }
    }
}

impl<T: Resource> fmt::Debug for CachedResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedResource")
            .field("kind", &T::KIND)
            .field("identity", &self.identity)
            .field("params", &self.params)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Reference-counted handle to a cache entry.
///
/// Cloning is cheap. While any handle is alive the cache never evicts the
/// entry.
pub struct Handle<T: Resource> {
    entry: Arc<CachedResource<T>>,
}

impl<T: Resource> Handle<T> {
    pub(crate) fn from_entry(entry: Arc<CachedResource<T>>) -> Self {
        Self { entry }
    }

    /// Cache key of the referenced entry.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> ResourceIdentity {
        self.entry.identity()
    }

    /// Parameters the resource was requested with.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &T::Params {
        self.entry.params()
    }

    /// Display name for logs.
    #[must_use]
    pub fn name(&self) -> String {
        self.entry.params().display_name()
    }

    /// Current load state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ResourceStatus {
        self.entry.status()
    }

    /// `true` once loading finished (successfully or not).
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.entry.status().is_ready()
    }

    /// `true` if the load finished and succeeded.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.entry.status() == ResourceStatus::Loaded
    }

    /// Payload, or `None` while loading. A failed load yields the placeholder.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.entry.get()
    }

    /// Blocks until ready, then returns the payload.
    pub fn wait(&self) -> &T {
        self.entry.wait()
    }

    /// The load error, if the load failed.
    #[must_use]
    pub fn error(&self) -> Option<&LoadError> {
        self.entry.error()
    }

    /// `true` if both handles refer to the same entry.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.entry, &b.entry)
    }

    /// Number of strong references to the entry, the cache's included.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.entry)
    }

    pub(crate) fn entry(&self) -> &CachedResource<T> {
        &self.entry
    }
}

impl<T: Resource> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<T: Resource> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &T::KIND)
            .field("identity", &self.identity())
            .field("status", &self.status())
            .finish()
    }
}
