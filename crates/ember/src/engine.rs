//! # Engine Loop
//!
//! ```text
//! tick(dt):
//!   accumulator += dt
//!   while accumulator >= step && steps < max:  game.on_fixed_update(step)
//!   game.on_update(dt)
//!   game.on_ui(ui)
//!   loader.update()                           (evict unreferenced resources)
//!   submit_with(|slot| slot.capture(world))   (blocks only if the GPU is a frame behind)
//!
//! shutdown():
//!   submit shutdown frame → join render thread → wait for loads
//!   → unload_all → game.on_shutdown
//! ```

use std::sync::Arc;

use ember_core::{frame_pipeline, AssetSource, FileSystemSource, FrameProducer, PipelineError};
use ember_rendering::{
    BackendError, FrameData, FrameFlags, RenderBackend, RenderStage, RenderStats, RenderThread,
    RenderThreadError, RenderWorld, UiCommand, Viewport,
};

use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::game::Game;

/// What one [`Engine::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame number submitted to the render thread.
    pub frame: u64,
    /// Fixed simulation steps run.
    pub fixed_steps: u32,
    /// Simulation time dropped because the step cap was hit.
    pub dropped_backlog: bool,
    /// Resources evicted by this tick's cache update.
    pub evicted: usize,
}

/// The main loop: owns the game, the render world and the render thread.
pub struct Engine<G: Game> {
    config: EngineConfig,
    context: EngineContext,
    world: RenderWorld,
    game: G,
    producer: Option<FrameProducer<FrameData>>,
    render_thread: Option<RenderThread>,
    ui: Vec<UiCommand>,
    accumulator: f32,
    frame_index: u64,
    window_size: [u32; 2],
    pending_resize: bool,
    final_stats: Option<RenderStats>,
}

impl<G: Game> Engine<G> {
    /// Starts the engine reading assets from `config.asset_root`.
    ///
    /// # Errors
    ///
    /// As [`with_source`](Self::with_source).
    pub fn new<B: RenderBackend>(config: EngineConfig, backend: B, game: G) -> EngineResult<Self> {
        let source = FileSystemSource::new(&config.asset_root);
        Self::with_source(config, Arc::new(source), backend, game)
    }

    /// Starts the engine: builds the context, spawns the render thread,
    /// waits until it is running, then calls `game.on_start`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] for an invalid config,
    /// [`EngineError::Io`] if threads cannot be spawned,
    /// [`EngineError::RenderThread`] if the backend fails to initialise.
    pub fn with_source<B: RenderBackend>(
        config: EngineConfig,
        source: Arc<dyn AssetSource>,
        backend: B,
        mut game: G,
    ) -> EngineResult<Self> {
        config.validate()?;
        let context = EngineContext::new(&config, source)?;

        let (producer, consumer) = frame_pipeline::<FrameData>();
        let render_thread = RenderThread::spawn(backend, consumer)?;
        render_thread.wait_for_stage(RenderStage::Running);
        if render_thread.stage() != RenderStage::Running {
            // The backend failed before the first frame.
            drop(producer);
            return Err(match render_thread.join() {
                Err(e) => e.into(),
                Ok(_) => RenderThreadError::Backend(BackendError::Initialization(
                    "render thread stopped before running".into(),
                ))
                .into(),
            });
        }

        let window_size = config.window_size;
        let mut world = RenderWorld::new();
        world.camera_mut().set_viewport(window_size[0], window_size[1]);
        game.on_start(&context, &mut world);

        tracing::info!(
            "Engine started: {}x{}, step {:.4}s",
            window_size[0],
            window_size[1],
            config.fixed_timestep
        );

        Ok(Self {
            config,
            context,
            world,
            game,
            producer: Some(producer),
            render_thread: Some(render_thread),
            ui: Vec::new(),
            accumulator: 0.0,
            frame_index: 0,
            window_size,
            pending_resize: false,
            final_stats: None,
        })
    }

    /// Runs one main-loop iteration with `dt` seconds of real time.
    ///
    /// # Errors
    ///
    /// [`EngineError::Pipeline`] if the render thread has stopped or the
    /// engine was shut down.
    pub fn tick(&mut self, dt: f32) -> EngineResult<TickReport> {
        if self.producer.is_none() {
            return Err(PipelineError::Disconnected.into());
        }

        let step = self.config.fixed_timestep;
        self.accumulator += dt.max(0.0);
        let mut fixed_steps = 0;
        while self.accumulator >= step && fixed_steps < self.config.max_steps_per_frame {
            self.game.on_fixed_update(step, &self.context, &mut self.world);
            self.accumulator -= step;
            fixed_steps += 1;
        }
        let dropped_backlog = self.accumulator >= step;
        if dropped_backlog {
            tracing::debug!(
                "Dropping {:.3}s of simulation backlog",
                self.accumulator - self.accumulator % step
            );
            self.accumulator %= step;
        }

        self.game.on_update(dt, &self.context, &mut self.world);
        self.ui.clear();
        self.game.on_ui(&mut self.ui);

        let evicted = self.context.loader().update();
        if evicted > 0 {
            tracing::trace!("Evicted {} resources", evicted);
        }

        let frame = self.submit_frame(false)?;
        Ok(TickReport {
            frame,
            fixed_steps,
            dropped_backlog,
            evicted,
        })
    }

    fn submit_frame(&mut self, shutdown: bool) -> EngineResult<u64> {
        let producer = self
            .producer
            .as_mut()
            .ok_or(EngineError::Pipeline(PipelineError::Disconnected))?;

        let world = &self.world;
        let ui = &self.ui;
        let [width, height] = self.window_size;
        let flags = FrameFlags {
            vsync: self.config.vsync,
            recreate_swapchain: self.pending_resize,
            debug_physics: self.config.debug_physics,
            shutdown,
        };
        let index = self.frame_index;
        let render = self.config.render;

        producer.submit_with(|frame| {
            frame.frame_index = index;
            frame.flags = flags;
            frame.viewport = Viewport::full(width, height);
            frame.window_size = [width, height];
            frame.config = render;
            if shutdown {
                frame.instances.clear();
                frame.ui.clear();
            } else {
                frame.capture(world);
                frame.set_ui(ui);
            }
        })?;

        self.pending_resize = false;
        self.frame_index += 1;
        Ok(index)
    }

    /// Flags a swapchain resize for the next submitted frame only.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.window_size = [width, height];
        self.pending_resize = true;
        self.world.camera_mut().set_viewport(width, height);
    }

    /// Stops the render thread and releases every resource.
    ///
    /// Safe to call more than once; later calls return the final stats
    /// without doing anything. Also runs on drop.
    ///
    /// # Errors
    ///
    /// [`EngineError::RenderThread`] if the render thread failed or
    /// panicked. Cleanup still completes, and later calls return `Ok`.
    pub fn shutdown(&mut self) -> EngineResult<RenderStats> {
        if let Some(stats) = self.final_stats {
            return Ok(stats);
        }
        tracing::info!("Engine shutting down after {} frames", self.frame_index);

        // A dead render thread makes this fail; joining reports why.
        if let Err(e) = self.submit_frame(true) {
            tracing::debug!("Shutdown frame not delivered: {}", e);
        }
        self.producer = None;

        let joined = match self.render_thread.take() {
            Some(thread) => thread.join(),
            None => Ok(RenderStats::default()),
        };

        self.world.clear();
        self.context.wait_idle();
        self.context.loader().unload_all();
        self.game.on_shutdown();

        self.final_stats = Some(joined.as_ref().map_or_else(|_| RenderStats::default(), |s| *s));
        joined.map_err(EngineError::from)
    }

    /// The engine context.
    #[must_use]
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// The render world.
    #[must_use]
    pub fn world(&self) -> &RenderWorld {
        &self.world
    }

    /// Mutable render world.
    pub fn world_mut(&mut self) -> &mut RenderWorld {
        &mut self.world
    }

    /// The game.
    #[must_use]
    pub fn game(&self) -> &G {
        &self.game
    }

    /// Mutable game.
    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of the next frame to be submitted.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Render thread stage; `Terminated` after shutdown.
    #[must_use]
    pub fn render_stage(&self) -> RenderStage {
        self.render_thread
            .as_ref()
            .map_or(RenderStage::Terminated, RenderThread::stage)
    }

    /// Render statistics as of the last frame the render thread published.
    #[must_use]
    pub fn render_stats(&self) -> RenderStats {
        match (&self.render_thread, self.final_stats) {
            (Some(thread), _) => thread.stats(),
            (None, stats) => stats.unwrap_or_default(),
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has completed.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.final_stats.is_some()
    }
}

impl<G: Game> Drop for Engine<G> {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            if let Err(e) = self.shutdown() {
                tracing::error!("Engine shutdown failed: {}", e);
            }
        }
    }
}
