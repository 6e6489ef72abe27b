//! 2D textures decoded to RGBA8.

use ember_core::{LoadContext, LoadError, Resource, ResourceParams};

/// Side length of the placeholder checkerboard.
const CHECKER_SIZE: u32 = 8;

/// Magenta, the "something is wrong" colour.
pub const MAGENTA: [u8; 4] = [255, 0, 255, 255];

/// Construction parameters of a [`Texture`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureParams {
    /// Path relative to the asset root.
    pub path: String,
    /// Whether the pixels are sRGB-encoded colour (vs. linear data).
    pub srgb: bool,
}

impl TextureParams {
    /// sRGB colour texture at `path`.
    pub fn color(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            srgb: true,
        }
    }

    /// Linear data texture (normals, roughness) at `path`.
    pub fn linear(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            srgb: false,
        }
    }
}

impl ResourceParams for TextureParams {
    fn source_path(&self) -> &str {
        &self.path
    }
}

/// CPU-side texture: tightly packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    width: u32,
    height: u32,
    srgb: bool,
    pixels: Vec<u8>,
}

impl Texture {
    /// Wraps raw RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// [`LoadError::Decode`] if `pixels` is not `width * height * 4` bytes.
    pub fn from_rgba8(width: u32, height: u32, srgb: bool, pixels: Vec<u8>) -> Result<Self, LoadError> {
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            return Err(LoadError::decode(format!(
                "{width}x{height} texture needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            srgb,
            pixels,
        })
    }

    /// A texture filled with one colour.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            srgb: false,
            pixels: rgba.repeat(count),
        }
    }

    /// A `size` x `size` checkerboard of one-pixel squares.
    #[must_use]
    pub fn checkerboard(size: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let pixels = (0..size)
            .flat_map(|y| (0..size).map(move |x| if (x + y) % 2 == 0 { a } else { b }))
            .flatten()
            .collect();
        Self {
            width: size,
            height: size,
            srgb: true,
            pixels,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixels are sRGB-encoded.
    #[must_use]
    pub fn is_srgb(&self) -> bool {
        self.srgb
    }

    /// Raw RGBA8 bytes, row by row.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The pixel at (`x`, `y`), or `None` if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl Resource for Texture {
    type Params = TextureParams;
    const KIND: &'static str = "texture";

    fn decode(params: &TextureParams, bytes: &[u8], _: &LoadContext<'_>) -> Result<Self, LoadError> {
        let image = image::load_from_memory(bytes).map_err(|e| LoadError::decode(e.to_string()))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(width, height, params.srgb, rgba.into_raw())
    }

    /// Magenta/black checkerboard.
    fn placeholder() -> Self {
        Self::checkerboard(CHECKER_SIZE, MAGENTA, [0, 0, 0, 255])
    }
}
