//! # EMBER Rendering
//!
//! Everything between the simulation and the graphics device:
//! - Math, frustum planes and bounding volumes
//! - Per-frustum visibility filter (main view + shadow cascades)
//! - Concrete cached resources (texture, model, material, shader)
//! - Render world, frame snapshot and the graphics thread
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────── MAIN THREAD ────────────────┐      ┌──────── GRAPHICS THREAD ────────┐
//! │ RenderWorld ──capture──► FrameProducer ─────┼─────►│ FrameConsumer                   │
//! │                          (write slot n % 2) │ seal │   → VisibilityFilter (5 frusta) │
//! │                                             │◄─────┼─  → RenderBackend passes        │
//! │                                             │ free │   → present, release slot       │
//! └─────────────────────────────────────────────┘      └─────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - The render thread only sees `FrameData`, never the live world
//! - Resources are read through handles; a loading model is simply not drawn
//! - No GPU API outside a `RenderBackend` implementation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod culling;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod render_world;
pub mod resources;

pub use culling::{
    Aabb, BoundingSphere, Cullable, Frustum, Plane, VisibilityFilter, VisibilityFrustum,
    VisibilityStats, CASCADE_COUNT, FRUSTUM_COUNT,
};
pub use error::{BackendError, RenderThreadError};
pub use math::{Mat4, Vec3};
pub use pipeline::{
    BackendCall, CallLog, FrameData, FrameFlags, FrameTiming, GpuTimingRing, HeadlessBackend,
    RenderBackend, RenderConfig, RenderStage, RenderStats, RenderThread, UiCommand, Viewport,
    RENDER_THREAD_NAME,
};
pub use render_world::{
    Camera, CascadeInfo, Light, LightKind, Projection, RenderWorld, RenderWorldInstance,
};
pub use resources::{
    DefaultTexture, DefaultTextures, Material, MaterialDescriptor, MaterialParams, Mesh, Model,
    ModelParams, Shader, ShaderParams, ShaderStage, Texture, TextureParams, TexturePaths,
    TextureSlot, MAGENTA,
};
