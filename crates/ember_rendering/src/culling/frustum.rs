//! Frustum planes and bounding volumes.
//!
//! Extracts frustum planes from a view-projection matrix and tests
//! bounding volumes against them.

use bytemuck::{Pod, Zeroable};

use crate::math::{Mat4, Vec3};

/// A plane in 3D space (Ax + By + Cz + D = 0).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Plane {
    /// Normal X component.
    pub a: f32,
    /// Normal Y component.
    pub b: f32,
    /// Normal Z component.
    pub c: f32,
    /// Distance from origin.
    pub d: f32,
}

impl Plane {
    /// Creates a new plane.
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    fn from_rows(lhs: [f32; 4], rhs: [f32; 4], sign: f32) -> Self {
        Self::new(
            lhs[0] + sign * rhs[0],
            lhs[1] + sign * rhs[1],
            lhs[2] + sign * rhs[2],
            lhs[3] + sign * rhs[3],
        )
        .normalized()
    }

    /// Normalizes the plane.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > 0.0 {
            Self {
                a: self.a / len,
                b: self.b / len,
                c: self.c / len,
                d: self.d / len,
            }
        } else {
            self
        }
    }

    /// Returns the signed distance from a point to the plane.
    ///
    /// Positive on the inside of a frustum plane.
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }
}

/// View frustum for culling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Left plane index.
    pub const LEFT: usize = 0;
    /// Right plane index.
    pub const RIGHT: usize = 1;
    /// Bottom plane index.
    pub const BOTTOM: usize = 2;
    /// Top plane index.
    pub const TOP: usize = 3;
    /// Near plane index.
    pub const NEAR: usize = 4;
    /// Far plane index.
    pub const FAR: usize = 5;

    /// Extracts frustum planes from a view-projection matrix.
    ///
    /// The matrix must be column-major with a `[-w, w]` depth range.
    #[must_use]
    pub fn from_view_projection(m: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));

        let mut planes = [Plane::default(); 6];
        planes[Self::LEFT] = Plane::from_rows(r3, r0, 1.0);
        planes[Self::RIGHT] = Plane::from_rows(r3, r0, -1.0);
        planes[Self::BOTTOM] = Plane::from_rows(r3, r1, 1.0);
        planes[Self::TOP] = Plane::from_rows(r3, r1, -1.0);
        planes[Self::NEAR] = Plane::from_rows(r3, r2, 1.0);
        planes[Self::FAR] = Plane::from_rows(r3, r2, -1.0);

        Self { planes }
    }

    /// Tests if a sphere intersects the frustum.
    ///
    /// A sphere exactly touching a plane from outside counts as visible.
    #[inline]
    #[must_use]
    pub fn test_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// The box from -0.5 to 0.5 on every axis.
    pub const UNIT_CUBE: Self = Self::new(Vec3::splat(-0.5), Vec3::splat(0.5));

    /// Creates a new AABB.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point; `None` if there are none.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| {
            Self::new(aabb.min.min(p), aabb.max.max(p))
        }))
    }

    /// Returns the center of the AABB.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents of the AABB.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// World-space bounding sphere of this local box under `world`.
    #[must_use]
    pub fn bounding_sphere(&self, world: &Mat4) -> BoundingSphere {
        BoundingSphere {
            center: world.transform_point3(self.center()),
            radius: self.half_extents().length() * world.max_axis_scale(),
        }
    }
}

/// A sphere used for coarse visibility tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingSphere {
    /// World-space center.
    pub center: Vec3,
    /// Radius.
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a sphere.
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        Frustum::from_view_projection(&(proj * view))
    }

    #[test]
    fn test_plane_normalization() {
        let plane = Plane::new(3.0, 4.0, 0.0, 10.0);
        let normalized = plane.normalized();

        // 3-4-5 triangle, so length is 5
        assert!((normalized.a - 0.6).abs() < 0.001);
        assert!((normalized.b - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_aabb_center() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(32.0));
        assert_eq!(aabb.center(), Vec3::splat(16.0));
        assert_eq!(aabb.half_extents(), Vec3::splat(16.0));
    }

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points([Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 4.0)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 4.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_sphere_in_front_is_visible() {
        let frustum = camera_frustum();
        assert!(frustum.test_sphere(&BoundingSphere::new(Vec3::ZERO, 1.0)));
    }

    #[test]
    fn test_sphere_behind_camera_is_culled() {
        let frustum = camera_frustum();
        assert!(!frustum.test_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, 20.0), 1.0)));
    }

    #[test]
    fn test_sphere_beyond_far_plane_is_culled() {
        let frustum = camera_frustum();
        assert!(!frustum.test_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, -200.0), 5.0)));
    }

    #[test]
    fn test_sphere_touching_plane_is_visible() {
        // Orthographic box: x in [-1, 1]. The left plane is x = -1.
        let frustum = Frustum::from_view_projection(&Mat4::orthographic_rh_gl(
            -1.0, 1.0, -1.0, 1.0, -1.0, 1.0,
        ));
        let touching = BoundingSphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0);
        assert!(frustum.test_sphere(&touching));

        let outside = BoundingSphere::new(Vec3::new(-2.5, 0.0, 0.0), 1.0);
        assert!(!frustum.test_sphere(&outside));
    }

    #[test]
    fn test_bounding_sphere_follows_transform() {
        let world = Mat4::from_scale_translation(Vec3::splat(2.0), Vec3::new(5.0, 0.0, 0.0));
        let sphere = Aabb::UNIT_CUBE.bounding_sphere(&world);
        assert_eq!(sphere.center, Vec3::new(5.0, 0.0, 0.0));
        assert!((sphere.radius - 3.0f32.sqrt()).abs() < 1e-5);
    }
}
