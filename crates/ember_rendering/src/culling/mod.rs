//! Visibility culling.
//!
//! Frustum planes are extracted from each view-projection matrix; every
//! render-ready instance is tested as a world-space bounding sphere.

mod frustum;
mod visibility;

pub use frustum::{Aabb, BoundingSphere, Frustum, Plane};
pub use visibility::{
    filter_visible, Cullable, VisibilityFilter, VisibilityFrustum, VisibilityStats, CASCADE_COUNT,
    FRUSTUM_COUNT,
};
