//! The per-frame snapshot handed from the main thread to the render thread.
//!
//! One `FrameData` lives in each pipeline slot and is overwritten in place
//! every tick, so its vectors keep their allocations.

use serde::{Deserialize, Serialize};

use crate::culling::{Frustum, CASCADE_COUNT, FRUSTUM_COUNT};
use crate::math::{Mat4, Vec3};
use crate::render_world::{CascadeInfo, Light, RenderWorld, RenderWorldInstance};

/// Which passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Run the 3D passes (shadows and opaque).
    pub use_3d: bool,
    /// Run the UI pass.
    pub use_2d: bool,
    /// Render shadow cascades when a light casts shadows.
    pub shadows: bool,
    /// Skip frustum tests: every loaded instance is visible everywhere.
    pub force_all_visible: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            use_3d: true,
            use_2d: true,
            shadows: true,
            force_all_visible: false,
        }
    }
}

/// One-frame flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags {
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
    /// The window was resized: recreate the swapchain before drawing.
    pub recreate_swapchain: bool,
    /// Draw physics debug geometry.
    pub debug_physics: bool,
    /// Last frame: the render thread stops after releasing it.
    pub shutdown: bool,
}

/// Viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Viewport {
    /// A viewport covering a `width` x `height` window.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// An immediate-mode UI draw command in window pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Filled rectangle.
    Rect {
        /// Top-left corner.
        position: [f32; 2],
        /// Width and height.
        size: [f32; 2],
        /// RGBA colour.
        color: [u8; 4],
    },
    /// A line of text.
    Text {
        /// Baseline origin.
        position: [f32; 2],
        /// Text to draw.
        text: String,
        /// RGBA colour.
        color: [u8; 4],
    },
}

/// Everything the render thread needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameData {
    /// Engine tick that produced this frame.
    pub frame_index: u64,
    /// Camera view matrix.
    pub view: Mat4,
    /// Camera projection matrix.
    pub projection: Mat4,
    /// Camera position in world space.
    pub camera_position: Vec3,
    /// Shadow cascades of the shadow light, if there is one.
    pub cascades: Option<[CascadeInfo; CASCADE_COUNT]>,
    /// Lights.
    pub lights: Vec<Light>,
    /// Draw instances, in draw order.
    pub instances: Vec<RenderWorldInstance>,
    /// UI commands, in draw order.
    pub ui: Vec<UiCommand>,
    /// One-frame flags.
    pub flags: FrameFlags,
    /// Viewport.
    pub viewport: Viewport,
    /// Window size in pixels.
    pub window_size: [u32; 2],
    /// Pass selection.
    pub config: RenderConfig,
}

impl FrameData {
    /// Copies `world` into this frame, reusing this frame's allocations.
    pub fn capture(&mut self, world: &RenderWorld) {
        let camera = world.camera();
        self.view = camera.view();
        self.projection = camera.projection_matrix();
        self.camera_position = camera.position;
        self.cascades = world.cascades();
        self.lights.clear();
        self.lights.extend_from_slice(world.lights());
        self.instances.clear();
        self.instances.extend_from_slice(world.instances());
    }

    /// Replaces the UI command list, reusing its allocation.
    pub fn set_ui(&mut self, commands: &[UiCommand]) {
        self.ui.clear();
        self.ui.extend_from_slice(commands);
    }

    /// `projection * view` of the camera.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Whether the shadow passes run this frame.
    #[must_use]
    pub fn shadows_enabled(&self) -> bool {
        self.config.use_3d && self.config.shadows && self.cascades.is_some()
    }

    /// Culling frustums: main view, then each cascade.
    ///
    /// Without a shadow light the cascade frustums are the unit clip cube.
    #[must_use]
    pub fn frustums(&self) -> [Frustum; FRUSTUM_COUNT] {
        let main = self.view_projection();
        std::array::from_fn(|k| match (k, &self.cascades) {
            (0, _) => Frustum::from_view_projection(&main),
            (k, Some(cascades)) => Frustum::from_view_projection(&cascades[k - 1].view_projection),
            (_, None) => Frustum::from_view_projection(&Mat4::IDENTITY),
        })
    }
}
