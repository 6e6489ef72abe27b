//! Shader sources.
//!
//! Compilation belongs to the backend; the cache only checks that the
//! source is text and declares the requested entry point.

use std::collections::BTreeMap;

use ember_core::{LoadContext, LoadError, Resource, ResourceParams};

/// Pipeline stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Pixel (fragment) shader.
    Pixel,
    /// Compute shader.
    Compute,
}

/// Construction parameters of a [`Shader`].
///
/// The same file compiled with different defines or entry points is a
/// different resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderParams {
    /// Path of the source relative to the asset root.
    pub path: String,
    /// Target stage.
    pub stage: ShaderStage,
    /// Entry point function name.
    pub entry_point: String,
    /// Preprocessor defines, sorted so the identity is order independent.
    pub defines: BTreeMap<String, String>,
}

impl ShaderParams {
    /// `entry_point` in the source at `path`, no defines.
    pub fn new(path: impl Into<String>, stage: ShaderStage, entry_point: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage,
            entry_point: entry_point.into(),
            defines: BTreeMap::new(),
        }
    }

    /// Adds a define.
    #[must_use]
    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }
}

impl ResourceParams for ShaderParams {
    fn source_path(&self) -> &str {
        &self.path
    }

    fn display_name(&self) -> String {
        format!("{}:{} ({:?})", self.path, self.entry_point, self.stage)
    }
}

/// Validated shader source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    stage: ShaderStage,
    entry_point: String,
    source: String,
}

impl Shader {
    /// Target stage.
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Entry point name. Empty on the error shader.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Source text. Empty on the error shader.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this is the error shader.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.source.is_empty()
    }
}

/// Whether `source` contains `name` as an identifier followed by `(`.
fn declares_function(source: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    source.match_indices(name).any(|(at, _)| {
        let before = source[..at].chars().next_back();
        let after = source[at + name.len()..].trim_start();
        !before.is_some_and(is_ident) && after.starts_with('(')
    })
}

impl Resource for Shader {
    type Params = ShaderParams;
    const KIND: &'static str = "shader";

    fn decode(params: &ShaderParams, bytes: &[u8], _: &LoadContext<'_>) -> Result<Self, LoadError> {
        let source = std::str::from_utf8(bytes).map_err(|e| LoadError::decode(e.to_string()))?;
        if !declares_function(source, &params.entry_point) {
            return Err(LoadError::decode(format!(
                "entry point `{}` not found",
                params.entry_point
            )));
        }
        Ok(Self {
            stage: params.stage,
            entry_point: params.entry_point.clone(),
            source: source.to_owned(),
        })
    }

    fn placeholder() -> Self {
        Self {
            stage: ShaderStage::Pixel,
            entry_point: String::new(),
            source: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{LoadMode, ManualExecutor, MemorySource, ResourceLoader};
    use std::sync::Arc;

    const SOURCE: &str = "float4 ps_main (float4 pos : SV_Position) : SV_Target { return 1; }";

    fn loader() -> Arc<ResourceLoader> {
        let source = MemorySource::new().with_file("lit.hlsl", SOURCE.as_bytes().to_vec());
        ResourceLoader::new(Arc::new(ManualExecutor::new()), Arc::new(source))
    }

    #[test]
    fn test_entry_point_detection() {
        assert!(declares_function(SOURCE, "ps_main"));
        assert!(!declares_function(SOURCE, "main"));
        assert!(!declares_function(SOURCE, "SV_Target"));
        assert!(!declares_function(SOURCE, ""));
    }

    #[test]
    fn test_decode() {
        let loader = loader();
        let shader = loader.load::<Shader>(
            ShaderParams::new("lit.hlsl", ShaderStage::Pixel, "ps_main"),
            LoadMode::Blocking,
        );
        assert!(shader.is_valid());
        assert_eq!(shader.wait().entry_point(), "ps_main");
        assert!(!shader.wait().is_error());
    }

    #[test]
    fn test_missing_entry_point_is_error_shader() {
        let loader = loader();
        let shader = loader.load::<Shader>(
            ShaderParams::new("lit.hlsl", ShaderStage::Vertex, "vs_main"),
            LoadMode::Blocking,
        );
        assert!(shader.is_ready());
        assert!(!shader.is_valid());
        assert!(shader.wait().is_error());
    }

    #[test]
    fn test_defines_change_identity() {
        let loader = loader();
        let base = ShaderParams::new("lit.hlsl", ShaderStage::Pixel, "ps_main");
        let a = loader.load::<Shader>(base.clone(), LoadMode::Blocking);
        let b = loader.load::<Shader>(base.with_define("SHADOWS", "1"), LoadMode::Blocking);
        assert_ne!(a.identity(), b.identity());
        assert_eq!(loader.stats().scheduled, 2);
    }
}
