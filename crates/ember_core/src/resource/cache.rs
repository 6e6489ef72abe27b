//! Per-type identity → entry map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{CachedResource, Handle, Resource, ResourceIdentity, ResourceParams};

/// Outcome of [`ResourceCache::get_or_insert`].
#[derive(Debug)]
pub enum Lookup<T: Resource> {
    /// An entry already existed; the caller shares it.
    Hit(Handle<T>),
    /// A fresh `Loading` entry was inserted; the caller must run the load.
    Miss(Handle<T>),
}

/// Map from identity to cache entry for one resource type.
///
/// At most one entry exists per identity. The lock guards only the map
/// operation itself, never a load body.
pub struct ResourceCache<T: Resource> {
    entries: Mutex<HashMap<ResourceIdentity, Arc<CachedResource<T>>>>,
}

impl<T: Resource> ResourceCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the existing entry for `params`, or inserts a `Loading` one.
    pub fn get_or_insert(&self, params: &T::Params) -> Lookup<T> {
        let identity = ResourceIdentity::of(T::KIND, params);
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&identity) {
            return Lookup::Hit(Handle::from_entry(Arc::clone(existing)));
        }

        let entry = Arc::new(CachedResource::new(identity, params.clone()));
        entries.insert(identity, Arc::clone(&entry));
        Lookup::Miss(Handle::from_entry(entry))
    }

    /// Registers an already-built payload under `params`.
    ///
    /// If an entry already exists it is returned unchanged.
    pub fn insert_ready(&self, params: T::Params, value: T) -> Handle<T> {
        let identity = ResourceIdentity::of(T::KIND, &params);
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(identity)
            .or_insert_with(|| Arc::new(CachedResource::ready(identity, params, value)));
        Handle::from_entry(Arc::clone(entry))
    }

    /// Looks up an entry without inserting.
    #[must_use]
    pub fn get(&self, identity: ResourceIdentity) -> Option<Handle<T>> {
        self.entries
            .lock()
            .get(&identity)
            .map(|entry| Handle::from_entry(Arc::clone(entry)))
    }

    /// `true` if an entry exists for `identity`.
    #[must_use]
    pub fn contains(&self, identity: ResourceIdentity) -> bool {
        self.entries.lock().contains_key(&identity)
    }

    /// Evicts every entry whose only strong reference is the cache's own.
    ///
    /// Entries still being loaded are held by their load task and are never
    /// candidates. Payloads are dropped after the lock is released.
    /// Returns the number of evicted entries.
    pub fn reap(&self) -> usize {
        let evicted: Vec<Arc<CachedResource<T>>> = {
            let mut entries = self.entries.lock();
            let candidates: Vec<ResourceIdentity> = entries
                .iter()
                .filter(|(_, entry)| Arc::strong_count(entry) == 1)
                .map(|(identity, _)| *identity)
                .collect();
            candidates
                .into_iter()
                .filter_map(|identity| entries.remove(&identity))
                .collect()
        };

        for entry in &evicted {
            tracing::trace!("Unloading {} \"{}\"", T::KIND, entry.params().display_name());
        }
        evicted.len()
    }

    /// Drops every entry regardless of outstanding handles.
    ///
    /// Outstanding handles keep their payload alive; the cache just forgets it.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        drained.len()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: Resource> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
