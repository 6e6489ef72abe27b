//! Meshes loaded from Wavefront OBJ.

use std::io::Cursor;

use ahash::AHashMap;
use ember_core::{LoadContext, LoadError, Resource, ResourceParams};

use crate::culling::Aabb;
use crate::math::Vec3;

/// Construction parameters of a [`Model`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelParams {
    /// Path of the `.obj` file relative to the asset root.
    pub path: String,
}

impl ModelParams {
    /// Model at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ResourceParams for ModelParams {
    fn source_path(&self) -> &str {
        &self.path
    }
}

/// One drawable range of a model's shared index buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    /// Object or group name from the file.
    pub name: String,
    /// First vertex of this mesh in the shared vertex buffer.
    pub first_vertex: u32,
    /// First index of this mesh in the shared index buffer.
    pub first_index: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Material slot within the file, if the mesh names one.
    pub material_index: Option<usize>,
}

/// CPU-side model: merged positions and indices plus per-mesh ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    meshes: Vec<Mesh>,
    bounds: Aabb,
}

impl Model {
    /// Sub-meshes in file order.
    #[must_use]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// All vertex positions, mesh after mesh.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// All indices, relative to each mesh's `first_vertex`.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Local-space bounding box.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Total index count over all meshes.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

fn to_u32(n: usize) -> Result<u32, LoadError> {
    u32::try_from(n).map_err(|_| LoadError::decode("model exceeds 2^32 vertices or indices"))
}

impl Resource for Model {
    type Params = ModelParams;
    const KIND: &'static str = "model";

    fn decode(_: &ModelParams, bytes: &[u8], _: &LoadContext<'_>) -> Result<Self, LoadError> {
        let text = std::str::from_utf8(bytes).map_err(|e| LoadError::decode(e.to_string()))?;

        // Materials come from our own descriptors, so `.mtl` files are ignored.
        let (models, _materials) = tobj::load_obj_buf(
            &mut Cursor::new(text),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok((Vec::new(), AHashMap::new())),
        )
        .map_err(|e| LoadError::decode(e.to_string()))?;

        let mut positions = Vec::new();
        let mut indices = Vec::new();
        let mut meshes = Vec::with_capacity(models.len());

        for model in models {
            let mesh = model.mesh;
            meshes.push(Mesh {
                name: model.name,
                first_vertex: to_u32(positions.len())?,
                first_index: to_u32(indices.len())?,
                index_count: to_u32(mesh.indices.len())?,
                material_index: mesh.material_id,
            });
            positions.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|v| Vec3::new(v[0], v[1], v[2])),
            );
            indices.extend_from_slice(&mesh.indices);
        }

        let bounds = Aabb::from_points(positions.iter().copied())
            .ok_or_else(|| LoadError::decode("model has no vertices"))?;

        Ok(Self {
            positions,
            indices,
            meshes,
            bounds,
        })
    }

    /// No meshes; unit cube bounds so the instance still culls sensibly.
    fn placeholder() -> Self {
        Self {
            positions: Vec::new(),
            indices: Vec::new(),
            meshes: Vec::new(),
            bounds: Aabb::UNIT_CUBE,
        }
    }
}
