//! The load protocol: miss → schedule → decode → publish.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::cache::{Lookup, ResourceCache};
use super::{AssetSource, Handle, Resource, ResourceParams};
use crate::error::LoadError;
use crate::task::Executor;

/// How a load request treats the calling thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Run the load body on the calling thread and return a ready handle.
    Blocking,
    /// Submit the load body to the executor and return immediately.
    #[default]
    NonBlocking,
}

/// Counters reported by [`ResourceLoader::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Load bodies ever started (one per cache miss).
    pub scheduled: u64,
    /// Load bodies that finished, successfully or not.
    pub completed: u64,
    /// Load bodies that finished with an error.
    pub failed: u64,
    /// Entries currently held by all caches.
    pub live: usize,
}

/// Type-erased view of a `ResourceCache<T>` for per-tick maintenance.
trait ErasedCache: Send + Sync {
    fn reap(&self) -> usize;
    fn clear(&self) -> usize;
    fn len(&self) -> usize;
}

impl<T: Resource> ErasedCache for ResourceCache<T> {
    fn reap(&self) -> usize {
        ResourceCache::reap(self)
    }

    fn clear(&self) -> usize {
        ResourceCache::clear(self)
    }

    fn len(&self) -> usize {
        ResourceCache::len(self)
    }
}

/// One registered cache, viewed both typed and erased.
struct CacheSlot {
    typed: Arc<dyn Any + Send + Sync>,
    erased: Arc<dyn ErasedCache>,
}

/// Owns one cache per resource type plus the executor and asset source.
///
/// Always used through an `Arc`: load bodies scheduled on the executor keep
/// the loader alive until they finish.
pub struct ResourceLoader {
    executor: Arc<dyn Executor>,
    source: Arc<dyn AssetSource>,
    caches: RwLock<HashMap<TypeId, CacheSlot>>,
    scheduled: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl ResourceLoader {
    /// Creates a loader that runs loads on `executor` and reads bytes
    /// from `source`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, source: Arc<dyn AssetSource>) -> Arc<Self> {
        Arc::new(Self {
            executor,
            source,
            caches: RwLock::new(HashMap::new()),
            scheduled: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    /// The executor load bodies run on.
    #[must_use]
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// The byte source.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn AssetSource> {
        &self.source
    }

    fn cache<T: Resource>(&self) -> Arc<ResourceCache<T>> {
        let key = TypeId::of::<T>();
        let existing = self.caches.read().get(&key).map(|slot| Arc::clone(&slot.typed));
        let typed = match existing {
            Some(typed) => typed,
            None => {
                let mut caches = self.caches.write();
                let slot = caches.entry(key).or_insert_with(|| {
                    let cache = Arc::new(ResourceCache::<T>::new());
                    CacheSlot {
                        typed: Arc::clone(&cache) as Arc<dyn Any + Send + Sync>,
                        erased: cache,
                    }
                });
                Arc::clone(&slot.typed)
            }
        };

        match typed.downcast::<ResourceCache<T>>() {
            Ok(cache) => cache,
            Err(_) => unreachable!("cache registered under the TypeId of another type"),
        }
    }

    /// Returns the handle for `params`, loading it on a miss.
    ///
    /// Concurrent requests with equal parameters share one entry and one
    /// load body. With [`LoadMode::Blocking`] the returned handle is ready.
    pub fn load<T: Resource>(self: &Arc<Self>, params: T::Params, mode: LoadMode) -> Handle<T> {
        match self.cache::<T>().get_or_insert(&params) {
            Lookup::Hit(handle) => {
                if mode == LoadMode::Blocking {
                    self.wait_for(&handle);
                }
                handle
            }
            Lookup::Miss(handle) => {
                self.scheduled.fetch_add(1, Ordering::AcqRel);
                tracing::debug!(
                    "Scheduling {} \"{}\" ({})",
                    T::KIND,
                    params.display_name(),
                    handle.identity()
                );
                match mode {
                    LoadMode::Blocking => self.wait_for(&handle),
                    LoadMode::NonBlocking => {
                        let loader = Arc::clone(self);
                        let task_handle = handle.clone();
                        self.executor.spawn(
                            T::KIND,
                            Box::new(move || {
                                if task_handle.entry().try_claim() {
                                    loader.run_load(&task_handle);
                                }
                            }),
                        );
                    }
                }
                handle
            }
        }
    }

    /// Registers an already-built payload. An existing entry wins.
    pub fn insert_ready<T: Resource>(&self, params: T::Params, value: T) -> Handle<T> {
        self.cache::<T>().insert_ready(params, value)
    }

    /// Blocks until `handle` is ready.
    ///
    /// If its load body is still queued, it is claimed and run on the
    /// calling thread.
    pub fn wait_for<T: Resource>(self: &Arc<Self>, handle: &Handle<T>) {
        if handle.is_ready() {
            return;
        }
        if handle.entry().try_claim() {
            self.run_load(handle);
        }
        handle.wait();
    }

    fn run_load<T: Resource>(self: &Arc<Self>, handle: &Handle<T>) {
        let params = handle.params();
        let ctx = LoadContext {
            loader: self,
            requester: T::KIND,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.source
                .read(params.source_path())
                .and_then(|bytes| T::decode(params, &bytes, &ctx))
        }))
        .unwrap_or_else(|payload| Err(LoadError::decode(panic_reason(payload.as_ref()))));

        match &result {
            Ok(_) => tracing::debug!("Loaded {} \"{}\"", T::KIND, params.display_name()),
            Err(err) => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                tracing::warn!(
                    "Failed to load {} \"{}\" ({}): {}",
                    T::KIND,
                    params.display_name(),
                    handle.identity(),
                    err
                );
            }
        }

        handle.entry().complete(result);
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    /// Per-tick maintenance: evicts every entry no handle refers to.
    ///
    /// Returns the number of evicted entries.
    pub fn update(&self) -> usize {
        let caches: Vec<Arc<dyn ErasedCache>> = self
            .caches
            .read()
            .values()
            .map(|slot| Arc::clone(&slot.erased))
            .collect();
        caches.iter().map(|cache| cache.reap()).sum()
    }

    /// Forgets every entry of every cache.
    pub fn unload_all(&self) -> usize {
        let caches: Vec<Arc<dyn ErasedCache>> = self
            .caches
            .read()
            .values()
            .map(|slot| Arc::clone(&slot.erased))
            .collect();
        let unloaded = caches.iter().map(|cache| cache.clear()).sum();
        tracing::debug!("Unloaded {} resources", unloaded);
        unloaded
    }

    /// Snapshot of the load counters.
    #[must_use]
    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            scheduled: self.scheduled.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            live: self.caches.read().values().map(|slot| slot.erased.len()).sum(),
        }
    }
}

impl fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("caches", &self.caches.read().len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Handed to [`Resource::decode`] so a resource can load what it depends on.
pub struct LoadContext<'a> {
    loader: &'a Arc<ResourceLoader>,
    requester: &'static str,
}

impl<'a> LoadContext<'a> {
    /// The loader running this load.
    #[must_use]
    pub fn loader(&self) -> &'a Arc<ResourceLoader> {
        self.loader
    }

    /// Loads a dependency and waits for it.
    ///
    /// The returned handle is ready; it may hold the dependency's placeholder.
    pub fn load_dependency<R: Resource>(&self, params: R::Params) -> Handle<R> {
        tracing::trace!(
            "{} requests dependency {} \"{}\"",
            self.requester,
            R::KIND,
            params.display_name()
        );
        self.loader.load(params, LoadMode::Blocking)
    }

    /// Like [`load_dependency`](Self::load_dependency), but a failed
    /// dependency fails the caller.
    ///
    /// # Errors
    ///
    /// [`LoadError::Dependency`] if the dependency did not load.
    pub fn require<R: Resource>(&self, params: R::Params) -> Result<Handle<R>, LoadError> {
        let handle = self.load_dependency::<R>(params);
        match handle.error() {
            Some(err) => Err(LoadError::Dependency {
                dependency: handle.name(),
                reason: err.to_string(),
            }),
            None => Ok(handle),
        }
    }
}

impl fmt::Debug for LoadContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("requester", &self.requester)
            .finish_non_exhaustive()
    }
}

/// Describes a caught decoder panic from its payload.
fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("decoder panicked: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MemorySource, ResourceStatus};
    use crate::task::{ManualExecutor, WorkerPool};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[derive(Clone, Debug, Hash)]
    struct Path(String);

    impl ResourceParams for Path {
        fn source_path(&self) -> &str {
            &self.0
        }
    }

    fn path(s: &str) -> Path {
        Path(s.to_owned())
    }

    /// Payload whose fields are all derived from one byte, so a torn read
    /// would show mismatched fields.
    #[derive(Debug)]
    struct Stamp {
        a: u64,
        b: u64,
        data: Vec<u8>,
    }

    impl Resource for Stamp {
        type Params = Path;
        const KIND: &'static str = "stamp";

        fn decode(_: &Path, bytes: &[u8], _: &LoadContext<'_>) -> Result<Self, LoadError> {
            let first = *bytes.first().ok_or_else(|| LoadError::decode("empty"))?;
            Ok(Self {
                a: u64::from(first),
                b: u64::from(first) * 2,
                data: vec![first; 256],
            })
        }

        fn placeholder() -> Self {
            Self {
                a: 0,
                b: 0,
                data: Vec::new(),
            }
        }
    }

    /// Depends on a `Stamp` named in its own bytes.
    struct Pair {
        inner: Option<Handle<Stamp>>,
    }

    impl Resource for Pair {
        type Params = Path;
        const KIND: &'static str = "pair";

        fn decode(_: &Path, bytes: &[u8], ctx: &LoadContext<'_>) -> Result<Self, LoadError> {
            let name = std::str::from_utf8(bytes).map_err(|e| LoadError::decode(e.to_string()))?;
            let inner = ctx.require::<Stamp>(path(name))?;
            Ok(Self { inner: Some(inner) })
        }

        fn placeholder() -> Self {
            Self { inner: None }
        }
    }

    static COUNTED_DECODES: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Resource for Counted {
        type Params = Path;
        const KIND: &'static str = "counted";

        fn decode(_: &Path, _: &[u8], _: &LoadContext<'_>) -> Result<Self, LoadError> {
            COUNTED_DECODES.fetch_add(1, Ordering::Relaxed);
            thread::sleep(std::time::Duration::from_millis(5));
            Ok(Self)
        }

        fn placeholder() -> Self {
            Self
        }
    }

    /// Decoder that panics instead of returning an error.
    struct Explosive;

    impl Resource for Explosive {
        type Params = Path;
        const KIND: &'static str = "explosive";

        fn decode(_: &Path, _: &[u8], _: &LoadContext<'_>) -> Result<Self, LoadError> {
            panic!("fuse lit");
        }

        fn placeholder() -> Self {
            Self
        }
    }

    fn manual_loader(source: MemorySource) -> (Arc<ManualExecutor>, Arc<ResourceLoader>) {
        let executor = Arc::new(ManualExecutor::new());
        let loader = ResourceLoader::new(executor.clone(), Arc::new(source));
        (executor, loader)
    }

    #[test]
    fn test_nonblocking_waits_for_executor() {
        let (executor, loader) = manual_loader(MemorySource::new().with_file("a", vec![3]));
        let handle = loader.load::<Stamp>(path("a"), LoadMode::NonBlocking);

        assert_eq!(handle.status(), ResourceStatus::Loading);
        assert!(handle.get().is_none());

        executor.pump();
        assert!(handle.is_valid());
        assert_eq!(handle.get().map(|s| s.b), Some(6));
    }

    #[test]
    fn test_blocking_load_is_ready() {
        let (executor, loader) = manual_loader(MemorySource::new().with_file("a", vec![1]));
        let handle = loader.load::<Stamp>(path("a"), LoadMode::Blocking);
        assert!(handle.is_valid());
        assert_eq!(executor.scheduled(), 0);
        assert_eq!(loader.stats().scheduled, 1);
    }

    #[test]
    fn test_missing_file_is_ready_and_invalid() {
        let (executor, loader) = manual_loader(MemorySource::new());
        let handle = loader.load::<Stamp>(path("missing"), LoadMode::NonBlocking);
        executor.pump();

        assert!(handle.is_ready());
        assert!(!handle.is_valid());
        assert!(handle.get().is_some_and(|s| s.data.is_empty()));
        assert!(matches!(handle.error(), Some(LoadError::NotFound { .. })));
        assert_eq!(loader.stats().failed, 1);
    }

    #[test]
    fn test_requests_coalesce() {
        let (executor, loader) = manual_loader(MemorySource::new().with_file("a", vec![1]));
        let first = loader.load::<Stamp>(path("a"), LoadMode::NonBlocking);
        let second = loader.load::<Stamp>(path("a"), LoadMode::NonBlocking);

        assert!(Handle::ptr_eq(&first, &second));
        assert_eq!(executor.scheduled(), 1);
        executor.pump();
        assert_eq!(loader.stats().completed, 1);
    }

    #[test]
    fn test_random_request_mix_loads_each_path_once() {
        use rand::{Rng, SeedableRng};
        use std::collections::HashSet;

        let source = MemorySource::new();
        for i in 0..8u8 {
            source.insert(format!("p{i}"), vec![i + 1]);
        }
        let (executor, loader) = manual_loader(source);

        let requested: Vec<HashSet<u8>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..4u64)
                .map(|seed| {
                    let loader = &loader;
                    scope.spawn(move || {
                        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                        let mut seen = HashSet::new();
                        for _ in 0..64 {
                            let i: u8 = rng.gen_range(0..8);
                            seen.insert(i);
                            drop(loader.load::<Stamp>(path(&format!("p{i}")), LoadMode::NonBlocking));
                        }
                        seen
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        let distinct: HashSet<u8> = requested.into_iter().flatten().collect();

        assert_eq!(executor.queued(), distinct.len());
        executor.pump();
        let stats = loader.stats();
        assert_eq!(stats.scheduled, distinct.len() as u64);
        assert_eq!(stats.completed, stats.scheduled);
    }

    #[test]
    fn test_wait_for_claims_queued_load() {
        let (executor, loader) = manual_loader(MemorySource::new().with_file("a", vec![9]));
        let handle = loader.load::<Stamp>(path("a"), LoadMode::NonBlocking);

        loader.wait_for(&handle);
        assert!(handle.is_valid());

        // The queued body finds the entry claimed and does nothing.
        executor.pump();
        assert_eq!(loader.stats().completed, 1);
    }

    #[test]
    fn test_blocking_hit_on_queued_entry_runs_inline() {
        let (executor, loader) = manual_loader(MemorySource::new().with_file("a", vec![2]));
        let queued = loader.load::<Stamp>(path("a"), LoadMode::NonBlocking);
        let blocking = loader.load::<Stamp>(path("a"), LoadMode::Blocking);

        assert!(Handle::ptr_eq(&queued, &blocking));
        assert!(queued.is_valid());
        assert_eq!(executor.queued(), 1);
    }

    #[test]
    fn test_dependency_loads_share_cache() {
        let source = MemorySource::new()
            .with_file("pair", b"inner".to_vec())
            .with_file("inner", vec![4]);
        let (_executor, loader) = manual_loader(source);

        let pair = loader.load::<Pair>(path("pair"), LoadMode::Blocking);
        assert!(pair.is_valid());
        let inner = pair.wait().inner.as_ref().unwrap();
        assert_eq!(inner.wait().a, 4);

        let again = loader.load::<Stamp>(path("inner"), LoadMode::NonBlocking);
        assert!(Handle::ptr_eq(&again, inner));
    }

    #[test]
    fn test_dependency_failure_fails_dependent() {
        let source = MemorySource::new().with_file("pair", b"absent".to_vec());
        let (_executor, loader) = manual_loader(source);

        let pair = loader.load::<Pair>(path("pair"), LoadMode::Blocking);
        assert!(pair.is_ready());
        assert!(!pair.is_valid());
        assert!(pair.wait().inner.is_none());
        assert!(matches!(
            pair.error(),
            Some(LoadError::Dependency { dependency, .. }) if dependency == "absent"
        ));
    }

    #[test]
    fn test_panicking_decoder_fails_entry_on_pool() {
        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let loader = ResourceLoader::new(
            pool.clone(),
            Arc::new(MemorySource::new().with_file("x", vec![1])),
        );

        let handle = loader.load::<Explosive>(path("x"), LoadMode::NonBlocking);
        pool.wait_idle();

        assert!(handle.is_ready());
        assert!(!handle.is_valid());
        assert!(matches!(
            handle.error(),
            Some(LoadError::Decode(reason)) if reason.contains("fuse lit")
        ));
        loader.wait_for(&handle);
        assert!(handle.get().is_some());
        assert_eq!(loader.stats().failed, 1);

        // The worker survived and keeps serving loads.
        let other = loader.load::<Explosive>(path("y"), LoadMode::NonBlocking);
        pool.wait_idle();
        assert!(other.is_ready());
    }

    #[test]
    fn test_panicking_decoder_blocking_returns_placeholder() {
        let (_executor, loader) = manual_loader(MemorySource::new().with_file("x", vec![1]));
        let handle = loader.load::<Explosive>(path("x"), LoadMode::Blocking);

        assert!(handle.is_ready());
        assert!(!handle.is_valid());
        assert!(handle.get().is_some());
    }

    #[test]
    fn test_update_evicts_unreferenced() {
        let (executor, loader) = manual_loader(MemorySource::new().with_file("a", vec![1]));
        let handle = loader.load::<Stamp>(path("a"), LoadMode::NonBlocking);

        // The queued body holds a handle, so nothing is evicted yet.
        assert_eq!(loader.update(), 0);
        executor.pump();
        assert_eq!(loader.update(), 0);

        drop(handle);
        assert_eq!(loader.update(), 1);
        assert_eq!(loader.stats().live, 0);

        let again = loader.load::<Stamp>(path("a"), LoadMode::NonBlocking);
        assert!(!again.is_ready());
        assert_eq!(loader.stats().scheduled, 2);
    }

    #[test]
    fn test_concurrent_requests_decode_once() {
        let pool = Arc::new(WorkerPool::new(4).unwrap());
        let source = MemorySource::new().with_file("shared", vec![5]);
        let loader = ResourceLoader::new(pool.clone(), Arc::new(source));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                thread::spawn(move || loader.load::<Counted>(path("shared"), LoadMode::NonBlocking))
            })
            .collect();
        let handles: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        pool.wait_idle();
        for handle in &handles {
            assert!(Handle::ptr_eq(handle, &handles[0]));
            assert!(handle.is_valid());
        }
        assert_eq!(loader.stats().scheduled, 1);
        assert_eq!(COUNTED_DECODES.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_ready_readers_never_see_torn_payload() {
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let source = MemorySource::new();
        for i in 1..=32u8 {
            source.insert(format!("stamp-{i}"), vec![i]);
        }
        let loader = ResourceLoader::new(pool.clone(), Arc::new(source));

        for i in 1..=32u8 {
            let handle = loader.load::<Stamp>(path(&format!("stamp-{i}")), LoadMode::NonBlocking);
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let handle = handle.clone();
                    thread::spawn(move || loop {
                        if let Some(stamp) = handle.get() {
                            assert_eq!(stamp.a, u64::from(i));
                            assert_eq!(stamp.b, stamp.a * 2);
                            assert_eq!(stamp.data.len(), 256);
                            assert!(stamp.data.iter().all(|&b| u64::from(b) == stamp.a));
                            break;
                        }
                        thread::yield_now();
                    })
                })
                .collect();
            for reader in readers {
                reader.join().unwrap();
            }
        }
        pool.wait_idle();
    }

    #[test]
    fn test_unload_all_clears_every_cache() {
        let source = MemorySource::new()
            .with_file("p", b"s".to_vec())
            .with_file("s", vec![1]);
        let (_executor, loader) = manual_loader(source);
        let pair = loader.load::<Pair>(path("p"), LoadMode::Blocking);
        assert_eq!(loader.stats().live, 2);

        assert_eq!(loader.unload_all(), 2);
        assert_eq!(loader.stats().live, 0);
        assert!(pair.is_valid());
    }
}
