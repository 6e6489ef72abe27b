//! # Rendering Resources
//!
//! Concrete payloads for the `ember_core` resource cache. Each type only
//! supplies `decode` and a placeholder; loading, coalescing and eviction
//! are shared.
//!
//! | Kind       | Format             | Placeholder                |
//! |------------|--------------------|----------------------------|
//! | `texture`  | PNG via `image`    | magenta/black checkerboard |
//! | `model`    | Wavefront OBJ      | no meshes, unit-cube bounds|
//! | `material` | TOML descriptor    | "error", no textures       |
//! | `shader`   | UTF-8 source       | empty error shader         |

pub mod defaults;
pub mod material;
pub mod model;
pub mod shader;
pub mod texture;

pub use defaults::{DefaultTexture, DefaultTextures};
pub use material::{Material, MaterialDescriptor, MaterialParams, TexturePaths, TextureSlot};
pub use model::{Mesh, Model, ModelParams};
pub use shader::{Shader, ShaderParams, ShaderStage};
pub use texture::{Texture, TextureParams, MAGENTA};
