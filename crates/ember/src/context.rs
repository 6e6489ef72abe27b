//! Process-wide engine services, owned in one place and passed by
//! reference instead of reached through globals.

use std::sync::Arc;

use ember_core::{
    AssetSource, Executor, FileSystemSource, Handle, LoadMode, LoaderStats, Resource,
    ResourceLoader, WorkerPool,
};
use ember_rendering::DefaultTextures;

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Worker pool, resource loader and built-in resources.
#[derive(Debug)]
pub struct EngineContext {
    executor: Arc<WorkerPool>,
    loader: Arc<ResourceLoader>,
    defaults: DefaultTextures,
}

impl EngineContext {
    /// Builds the services reading assets from `source`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`](crate::EngineError::Io) if worker threads cannot
    /// be spawned.
    pub fn new(config: &EngineConfig, source: Arc<dyn AssetSource>) -> EngineResult<Self> {
        let threads = config.resolved_worker_threads();
        let executor = Arc::new(WorkerPool::new(threads)?);
        let loader = ResourceLoader::new(executor.clone(), source);
        let defaults = DefaultTextures::register(&loader);

        tracing::info!("Engine context ready ({} resource workers)", threads);
        Ok(Self {
            executor,
            loader,
            defaults,
        })
    }

    /// Builds the services reading assets from `config.asset_root`.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let source = FileSystemSource::new(&config.asset_root);
        Self::new(config, Arc::new(source))
    }

    /// The resource loader.
    #[must_use]
    pub fn loader(&self) -> &Arc<ResourceLoader> {
        &self.loader
    }

    /// The resource worker pool.
    #[must_use]
    pub fn executor(&self) -> &Arc<WorkerPool> {
        &self.executor
    }

    /// Built-in textures.
    #[must_use]
    pub fn defaults(&self) -> &DefaultTextures {
        &self.defaults
    }

    /// Shorthand for `loader().load(params, mode)`.
    pub fn load<T: Resource>(&self, params: T::Params, mode: LoadMode) -> Handle<T> {
        self.loader.load(params, mode)
    }

    /// Blocks until every queued load has finished.
    pub fn wait_idle(&self) {
        self.executor.wait_idle();
    }

    /// Loader counters.
    #[must_use]
    pub fn stats(&self) -> LoaderStats {
        self.loader.stats()
    }
}
