//! Materials: a TOML descriptor naming up to five textures.
//!
//! ```toml
//! name = "brick"
//! double_sided = false
//!
//! [textures]
//! albedo = "textures/brick_albedo.png"
//! normal = "textures/brick_normal.png"
//! ```
//!
//! Textures load as blocking dependencies. An empty slot gets a built-in
//! default; a texture that fails to load keeps its error checkerboard, and
//! the material itself still loads.

use ember_core::{Handle, LoadContext, LoadError, Resource, ResourceParams};
use serde::Deserialize;

use super::defaults::DefaultTexture;
use super::texture::{Texture, TextureParams};

/// Texture slots of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Base colour (sRGB).
    Albedo,
    /// Metalness in B, roughness in G (linear).
    MetalnessRoughness,
    /// Tangent-space normal (linear).
    Normal,
    /// Ambient occlusion (linear).
    Ao,
    /// Emissive colour (sRGB).
    Emissive,
}

impl TextureSlot {
    /// Number of slots.
    pub const COUNT: usize = 5;

    /// Every slot, in storage order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Albedo,
        Self::MetalnessRoughness,
        Self::Normal,
        Self::Ao,
        Self::Emissive,
    ];

    /// Built-in texture used when the descriptor leaves this slot empty.
    #[must_use]
    pub const fn fallback(self) -> DefaultTexture {
        match self {
            Self::Albedo | Self::Ao => DefaultTexture::White,
            Self::MetalnessRoughness => DefaultTexture::DefaultRoughness,
            Self::Normal => DefaultTexture::FlatNormal,
            Self::Emissive => DefaultTexture::Black,
        }
    }

    const fn is_color(self) -> bool {
        matches!(self, Self::Albedo | Self::Emissive)
    }
}

/// Construction parameters of a [`Material`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialParams {
    /// Path of the `.toml` descriptor relative to the asset root.
    pub path: String,
}

impl MaterialParams {
    /// Material described at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ResourceParams for MaterialParams {
    fn source_path(&self) -> &str {
        &self.path
    }
}

/// On-disk form of a material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialDescriptor {
    /// Display name.
    pub name: String,
    /// Disable back-face culling.
    #[serde(default)]
    pub double_sided: bool,
    /// Texture paths per slot.
    #[serde(default)]
    pub textures: TexturePaths,
}

/// Texture paths of a [`MaterialDescriptor`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TexturePaths {
    /// Albedo texture.
    pub albedo: Option<String>,
    /// Metalness/roughness texture.
    pub metalness_roughness: Option<String>,
    /// Normal map.
    pub normal: Option<String>,
    /// Ambient occlusion map.
    pub ao: Option<String>,
    /// Emissive texture.
    pub emissive: Option<String>,
}

impl TexturePaths {
    /// The path for `slot`, if any.
    #[must_use]
    pub fn get(&self, slot: TextureSlot) -> Option<&str> {
        match slot {
            TextureSlot::Albedo => self.albedo.as_deref(),
            TextureSlot::MetalnessRoughness => self.metalness_roughness.as_deref(),
            TextureSlot::Normal => self.normal.as_deref(),
            TextureSlot::Ao => self.ao.as_deref(),
            TextureSlot::Emissive => self.emissive.as_deref(),
        }
        .filter(|path| !path.is_empty())
    }
}

impl MaterialDescriptor {
    /// Parses a TOML descriptor.
    ///
    /// # Errors
    ///
    /// [`LoadError::Decode`] on invalid UTF-8 or TOML.
    pub fn from_toml(bytes: &[u8]) -> Result<Self, LoadError> {
        let text = std::str::from_utf8(bytes).map_err(|e| LoadError::decode(e.to_string()))?;
        toml::from_str(text).map_err(|e| LoadError::decode(e.to_string()))
    }
}

/// A surface description: flags plus one texture per slot.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    double_sided: bool,
    textures: [Option<Handle<Texture>>; TextureSlot::COUNT],
}

impl Material {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether back faces are drawn.
    #[must_use]
    pub fn double_sided(&self) -> bool {
        self.double_sided
    }

    /// Texture bound to `slot`. `None` only on the error material.
    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<&Handle<Texture>> {
        self.textures[slot as usize].as_ref()
    }

    /// Slots whose texture failed to load.
    pub fn failed_slots(&self) -> impl Iterator<Item = TextureSlot> + '_ {
        TextureSlot::ALL.into_iter().filter(|&slot| {
            self.texture(slot)
                .map_or(true, |handle| handle.is_ready() && !handle.is_valid())
        })
    }
}

impl Resource for Material {
    type Params = MaterialParams;
    const KIND: &'static str = "material";

    fn decode(params: &MaterialParams, bytes: &[u8], ctx: &LoadContext<'_>) -> Result<Self, LoadError> {
        let descriptor = MaterialDescriptor::from_toml(bytes)?;

        let textures = TextureSlot::ALL.map(|slot| {
            let handle = match descriptor.textures.get(slot) {
                Some(path) => {
                    let texture = TextureParams {
                        path: path.to_owned(),
                        srgb: slot.is_color(),
                    };
                    ctx.load_dependency::<Texture>(texture)
                }
                None => slot.fallback().handle(ctx.loader()),
            };
            if !handle.is_valid() {
                tracing::warn!(
                    "Material \"{}\" ({}): {:?} texture \"{}\" failed, using error texture",
                    descriptor.name,
                    params.path,
                    slot,
                    handle.name()
                );
            }
            Some(handle)
        });

        Ok(Self {
            name: descriptor.name,
            double_sided: descriptor.double_sided,
            textures,
        })
    }

    /// Named "error", no textures.
    fn placeholder() -> Self {
        Self {
            name: "error".to_owned(),
            double_sided: false,
            textures: Default::default(),
        }
    }
}
