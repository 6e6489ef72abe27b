//! # Render World
//!
//! What the simulation wants drawn: one camera, a light list and model
//! instances. The main thread owns it; each tick it is copied into the
//! frame slot being written, so the render thread never sees it directly.
//!
//! ## Shadow cascades
//!
//! The camera's depth range is split logarithmically into
//! [`CASCADE_COUNT`] slices. Each slice is wrapped in a sphere and the
//! shadow-casting directional light gets an orthographic box around it:
//!
//! ```text
//!   near ──┬────┬───────┬──────────────┬─────────────────────── far
//!          │ c0 │  c1   │      c2      │           c3
//!   z_i = near * (far / near)^(i / CASCADE_COUNT)
//! ```

use ember_core::Handle;
use serde::{Deserialize, Serialize};

use crate::culling::{BoundingSphere, Cullable, CASCADE_COUNT};
use crate::math::{Mat4, Vec3};
use crate::resources::{Material, Model};

/// Camera projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Perspective with a vertical field of view in radians.
    Perspective {
        /// Vertical field of view (radians).
        fov_y: f32,
    },
    /// Orthographic with a fixed view height in world units.
    Orthographic {
        /// Height of the view volume.
        height: f32,
    },
}

/// The view camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Point looked at.
    pub target: Vec3,
    /// Up hint.
    pub up: Vec3,
    /// Projection kind.
    pub projection: Projection,
    /// Width over height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::Perspective {
                fov_y: std::f32::consts::FRAC_PI_3,
            },
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Updates the aspect ratio from a viewport size. Zero sizes are ignored.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Unit view direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// World-to-view matrix.
    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// View-to-clip matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => {
                Mat4::perspective_rh_gl(fov_y, self.aspect, self.near, self.far)
            }
            Projection::Orthographic { height } => {
                let half_h = height * 0.5;
                let half_w = half_h * self.aspect;
                Mat4::orthographic_rh_gl(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        }
    }

    /// `projection * view`.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view()
    }

    /// World-space corners of the view volume between depths `z0` and `z1`.
    ///
    /// Near corners first, each ring ordered bottom-left, bottom-right,
    /// top-right, top-left.
    #[must_use]
    pub fn slice_corners(&self, z0: f32, z1: f32) -> [Vec3; 8] {
        let forward = self.forward();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);

        let half_extents = |z: f32| match self.projection {
            Projection::Perspective { fov_y } => {
                let half_h = z * (fov_y * 0.5).tan();
                (half_h * self.aspect, half_h)
            }
            Projection::Orthographic { height } => (height * 0.5 * self.aspect, height * 0.5),
        };

        let mut corners = [Vec3::ZERO; 8];
        for (ring, z) in [z0, z1].into_iter().enumerate() {
            let (w, h) = half_extents(z);
            let center = self.position + forward * z;
            let ring_corners = [
                center - right * w - up * h,
                center + right * w - up * h,
                center + right * w + up * h,
                center - right * w + up * h,
            ];
            corners[ring * 4..ring * 4 + 4].copy_from_slice(&ring_corners);
        }
        corners
    }
}

/// Kind of light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    /// Infinitely distant; only its direction matters.
    Directional,
    /// Omnidirectional with a range.
    Point,
    /// Cone with inner and outer angles (radians).
    Spot {
        /// Full-intensity cone angle.
        cone_angle: f32,
        /// Falloff end angle.
        outer_cone_angle: f32,
    },
}

/// A light in the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Kind and kind-specific parameters.
    pub kind: LightKind,
    /// World position (unused for directional lights).
    pub position: Vec3,
    /// Direction the light travels.
    pub direction: Vec3,
    /// Linear RGB colour times intensity.
    pub color: Vec3,
    /// Attenuation range (point and spot).
    pub range: f32,
    /// Whether this light renders shadow cascades.
    pub casts_shadow: bool,
}

impl Light {
    /// A directional light travelling along `direction`.
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction: direction.normalize_or_zero(),
            color,
            range: 0.0,
            casts_shadow: false,
        }
    }

    /// A point light.
    #[must_use]
    pub fn point(position: Vec3, color: Vec3, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            direction: Vec3::ZERO,
            color,
            range,
            casts_shadow: false,
        }
    }

    /// Enables or disables shadow casting.
    #[must_use]
    pub fn with_shadows(mut self, casts_shadow: bool) -> Self {
        self.casts_shadow = casts_shadow;
        self
    }

    /// Whether this is a directional light.
    #[must_use]
    pub fn is_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional)
    }
}

/// One shadow cascade of a directional light.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CascadeInfo {
    /// Centre of the covered camera slice.
    pub center: Vec3,
    /// Light view matrix.
    pub view: Mat4,
    /// Light orthographic projection.
    pub projection: Mat4,
    /// `projection * view`.
    pub view_projection: Mat4,
    /// Far distance of the slice along the camera's view direction.
    pub split_depth: f32,
}

/// Logarithmic split depths: `CASCADE_COUNT + 1` values from `near` to `far`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cascade_splits(near: f32, far: f32) -> [f32; CASCADE_COUNT + 1] {
    let mut splits = [0.0; CASCADE_COUNT + 1];
    for (i, split) in splits.iter_mut().enumerate() {
        *split = near * (far / near).powf(i as f32 / CASCADE_COUNT as f32);
    }
    splits
}

/// Light-space boxes covering each camera slice for a light travelling
/// along `direction`.
#[must_use]
pub fn compute_cascades(camera: &Camera, direction: Vec3) -> [CascadeInfo; CASCADE_COUNT] {
    let direction = direction.normalize_or_zero();
    // look_at degenerates when the up hint is parallel to the view.
    let up = if direction.cross(Vec3::Y).length() < 1e-4 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let splits = cascade_splits(camera.near, camera.far);

    std::array::from_fn(|i| {
        let corners = camera.slice_corners(splits[i], splits[i + 1]);
        let center = corners.iter().fold(Vec3::ZERO, |acc, &c| acc + c) * (1.0 / 8.0);
        let radius = corners
            .iter()
            .map(|&c| (c - center).length())
            .fold(0.0, f32::max);

        let eye = center - direction * (radius * 2.0);
        let view = Mat4::look_at_rh(eye, center, up);
        let projection = Mat4::orthographic_rh_gl(-radius, radius, -radius, radius, 0.0, radius * 4.0);
        CascadeInfo {
            center,
            view,
            projection,
            view_projection: projection * view,
            split_depth: splits[i + 1],
        }
    })
}

/// A model placed in the world.
#[derive(Debug, Clone)]
pub struct RenderWorldInstance {
    /// Local-to-world transform.
    pub transform: Mat4,
    /// Model to draw. `None` draws nothing.
    pub model: Option<Handle<Model>>,
    /// Material override for every mesh of the model.
    pub material: Option<Handle<Material>>,
}

impl RenderWorldInstance {
    /// An instance of `model` at `transform`.
    #[must_use]
    pub fn new(transform: Mat4, model: Handle<Model>) -> Self {
        Self {
            transform,
            model: Some(model),
            material: None,
        }
    }

    /// Sets the material.
    #[must_use]
    pub fn with_material(mut self, material: Handle<Material>) -> Self {
        self.material = Some(material);
        self
    }

    /// Whether the model and the material, if any, have finished loading
    /// (successfully or not).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.model.as_ref().is_some_and(Handle::is_ready) && self.material_ready()
    }

    fn material_ready(&self) -> bool {
        self.material.as_ref().map_or(true, Handle::is_ready)
    }
}

impl Cullable for RenderWorldInstance {
    fn bounding_sphere(&self) -> Option<BoundingSphere> {
        if !self.material_ready() {
            return None;
        }
        let model = self.model.as_ref()?.get()?;
        Some(model.bounds().bounding_sphere(&self.transform))
    }
}

/// Index of an instance in its [`RenderWorld`].
pub type InstanceIndex = usize;

/// The scene as the simulation sees it.
#[derive(Debug, Clone, Default)]
pub struct RenderWorld {
    camera: Camera,
    lights: Vec<Light>,
    instances: Vec<RenderWorldInstance>,
}

impl RenderWorld {
    /// Instances reserved up front.
    pub const INSTANCE_RESERVE: usize = 512;
    /// Lights reserved up front.
    pub const LIGHT_RESERVE: usize = 10;

    /// An empty world with the default camera.
    #[must_use]
    pub fn new() -> Self {
        Self {
            camera: Camera::default(),
            lights: Vec::with_capacity(Self::LIGHT_RESERVE),
            instances: Vec::with_capacity(Self::INSTANCE_RESERVE),
        }
    }

    /// The view camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable view camera.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Adds an instance, returning its index.
    pub fn add_instance(&mut self, instance: RenderWorldInstance) -> InstanceIndex {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    /// Removes the instance at `index`. Later instances shift down by one,
    /// keeping draw order stable.
    pub fn remove_instance(&mut self, index: InstanceIndex) -> Option<RenderWorldInstance> {
        (index < self.instances.len()).then(|| self.instances.remove(index))
    }

    /// All instances in draw order.
    #[must_use]
    pub fn instances(&self) -> &[RenderWorldInstance] {
        &self.instances
    }

    /// Mutable instances.
    pub fn instances_mut(&mut self) -> &mut [RenderWorldInstance] {
        &mut self.instances
    }

    /// Adds a light, returning its index.
    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Removes the light at `index`.
    pub fn remove_light(&mut self, index: usize) -> Option<Light> {
        (index < self.lights.len()).then(|| self.lights.remove(index))
    }

    /// All lights.
    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// The first directional light that casts shadows.
    #[must_use]
    pub fn shadow_light(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|light| light.is_directional() && light.casts_shadow)
    }

    /// Cascades for the shadow light, or `None` without one.
    #[must_use]
    pub fn cascades(&self) -> Option<[CascadeInfo; CASCADE_COUNT]> {
        self.shadow_light()
            .map(|light| compute_cascades(&self.camera, light.direction))
    }

    /// Drops every instance and light. The camera is kept.
    pub fn clear(&mut self) {
        self.instances.clear();
        self.lights.clear();
    }
}
