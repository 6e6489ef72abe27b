//! Built-in textures used when a material leaves a slot empty or a load fails.

use std::sync::Arc;

use ember_core::{Handle, ResourceLoader};

use super::texture::{Texture, TextureParams, MAGENTA};

/// Side length of the built-in solid textures.
const DEFAULT_SIZE: u32 = 4;

/// The built-in textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultTexture {
    /// All channels zero.
    Black,
    /// Opaque white.
    White,
    /// Tangent-space "straight up" normal.
    FlatNormal,
    /// Mid roughness, non-metal, in the metalness/roughness layout.
    DefaultRoughness,
    /// The magenta/black error checkerboard.
    Error,
}

impl DefaultTexture {
    /// Every built-in texture.
    pub const ALL: [Self; 5] = [
        Self::Black,
        Self::White,
        Self::FlatNormal,
        Self::DefaultRoughness,
        Self::Error,
    ];

    /// Cache parameters. The paths never exist on disk.
    #[must_use]
    pub fn params(self) -> TextureParams {
        let name = match self {
            Self::Black => "black",
            Self::White => "white",
            Self::FlatNormal => "default_normal",
            Self::DefaultRoughness => "default_roughness",
            Self::Error => "error",
        };
        TextureParams::linear(format!("builtin://{name}"))
    }

    /// Builds the pixels.
    #[must_use]
    pub fn build(self) -> Texture {
        match self {
            Self::Black => Texture::solid(DEFAULT_SIZE, DEFAULT_SIZE, [0, 0, 0, 0]),
            Self::White => Texture::solid(DEFAULT_SIZE, DEFAULT_SIZE, [255; 4]),
            Self::FlatNormal => Texture::solid(DEFAULT_SIZE, DEFAULT_SIZE, [125, 125, 255, 255]),
            Self::DefaultRoughness => {
                Texture::solid(DEFAULT_SIZE, DEFAULT_SIZE, [255, 125, 0, 255])
            }
            Self::Error => Texture::checkerboard(8, MAGENTA, [0, 0, 0, 255]),
        }
    }

    /// Handle to this texture in `loader`'s cache, inserting it if absent.
    pub fn handle(self, loader: &ResourceLoader) -> Handle<Texture> {
        loader.insert_ready(self.params(), self.build())
    }
}

/// Owns handles to every built-in texture so they are never evicted.
#[derive(Debug, Clone)]
pub struct DefaultTextures {
    handles: [Handle<Texture>; 5],
}

impl DefaultTextures {
    /// Registers every built-in texture with `loader`.
    #[must_use]
    pub fn register(loader: &Arc<ResourceLoader>) -> Self {
        let handles = DefaultTexture::ALL.map(|texture| texture.handle(loader));
        tracing::debug!("Registered {} default textures", handles.len());
        Self { handles }
    }

    /// Handle of `texture`.
    #[must_use]
    pub fn get(&self, texture: DefaultTexture) -> &Handle<Texture> {
        &self.handles[texture as usize]
    }

    /// All channels zero.
    #[must_use]
    pub fn black(&self) -> &Handle<Texture> {
        self.get(DefaultTexture::Black)
    }

    /// Opaque white.
    #[must_use]
    pub fn white(&self) -> &Handle<Texture> {
        self.get(DefaultTexture::White)
    }

    /// Flat normal.
    #[must_use]
    pub fn flat_normal(&self) -> &Handle<Texture> {
        self.get(DefaultTexture::FlatNormal)
    }

    /// Default metalness/roughness.
    #[must_use]
    pub fn default_roughness(&self) -> &Handle<Texture> {
        self.get(DefaultTexture::DefaultRoughness)
    }

    /// Error checkerboard.
    #[must_use]
    pub fn error(&self) -> &Handle<Texture> {
        self.get(DefaultTexture::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{LoadMode, ManualExecutor, MemorySource};

    fn loader() -> Arc<ResourceLoader> {
        ResourceLoader::new(Arc::new(ManualExecutor::new()), Arc::new(MemorySource::new()))
    }

    #[test]
    fn test_register_all_ready() {
        let loader = loader();
        let defaults = DefaultTextures::register(&loader);
        for texture in DefaultTexture::ALL {
            assert!(defaults.get(texture).is_valid());
        }
        assert_eq!(defaults.white().wait().pixel(0, 0), Some([255; 4]));
        assert_eq!(defaults.flat_normal().wait().pixel(3, 3), Some([125, 125, 255, 255]));
        assert_eq!(loader.stats().scheduled, 0);
    }

    #[test]
    fn test_defaults_survive_eviction() {
        let loader = loader();
        let defaults = DefaultTextures::register(&loader);
        assert_eq!(loader.update(), 0);
        drop(defaults);
        assert_eq!(loader.update(), 5);
    }

    #[test]
    fn test_load_by_params_hits_builtin() {
        let loader = loader();
        let defaults = DefaultTextures::register(&loader);
        let black = loader.load::<Texture>(DefaultTexture::Black.params(), LoadMode::NonBlocking);
        assert!(Handle::ptr_eq(&black, defaults.black()));
    }
}
