//! The hooks a game plugs into the engine loop.

use ember_rendering::{RenderWorld, UiCommand};

use crate::context::EngineContext;

/// Game logic driven by [`Engine`](crate::Engine).
///
/// All hooks run on the main thread. Per tick the order is
/// `on_fixed_update` × N, `on_update`, `on_ui`.
pub trait Game {
    /// Called once after the render thread is running.
    fn on_start(&mut self, _ctx: &EngineContext, _world: &mut RenderWorld) {}

    /// Fixed-rate simulation step of `dt` seconds.
    fn on_fixed_update(&mut self, _dt: f32, _ctx: &EngineContext, _world: &mut RenderWorld) {}

    /// Once per tick with the real elapsed time.
    fn on_update(&mut self, _dt: f32, _ctx: &EngineContext, _world: &mut RenderWorld) {}

    /// Emits this tick's UI. `ui` starts empty every tick.
    fn on_ui(&mut self, _ui: &mut Vec<UiCommand>) {}

    /// Called once after the render thread has stopped and the caches are
    /// cleared.
    fn on_shutdown(&mut self) {}
}

/// A game that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyGame;

impl Game for EmptyGame {}
