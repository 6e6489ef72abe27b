//! Per-frustum visibility filter.
//!
//! ```text
//!   instances[M] ──► for each frustum f in [Main, Cascade0..3]:
//!                        for each instance i in input order:
//!                            skip if not render-ready
//!                            keep if force_all_visible or sphere ∩ f
//!                    ──► visible[f] = stable list of instance indices
//! ```

use super::frustum::{BoundingSphere, Frustum};

/// Number of shadow cascades.
pub const CASCADE_COUNT: usize = 4;

/// Number of frustums the filter runs per frame (main view + cascades).
pub const FRUSTUM_COUNT: usize = 1 + CASCADE_COUNT;

/// Which frustum a visible list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityFrustum {
    /// The camera view.
    Main,
    /// Shadow cascade 0 (nearest).
    Cascade0,
    /// Shadow cascade 1.
    Cascade1,
    /// Shadow cascade 2.
    Cascade2,
    /// Shadow cascade 3 (farthest).
    Cascade3,
}

impl VisibilityFrustum {
    /// Every frustum, in processing order.
    pub const ALL: [Self; FRUSTUM_COUNT] = [
        Self::Main,
        Self::Cascade0,
        Self::Cascade1,
        Self::Cascade2,
        Self::Cascade3,
    ];

    /// Position in [`ALL`](Self::ALL).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The frustum of shadow cascade `cascade`.
    ///
    /// # Panics
    ///
    /// Panics if `cascade >= CASCADE_COUNT`.
    #[must_use]
    pub const fn cascade(cascade: usize) -> Self {
        Self::ALL[1 + cascade]
    }
}

/// Something the filter can test.
pub trait Cullable {
    /// World-space bounding sphere, or `None` if the instance is not
    /// render-ready yet (its model is still loading). Not-ready instances
    /// are skipped silently.
    fn bounding_sphere(&self) -> Option<BoundingSphere>;
}

impl Cullable for BoundingSphere {
    fn bounding_sphere(&self) -> Option<BoundingSphere> {
        Some(*self)
    }
}

impl<T: Cullable> Cullable for Option<T> {
    fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.as_ref().and_then(Cullable::bounding_sphere)
    }
}

/// Counters from the last [`VisibilityFilter::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityStats {
    /// Instances in the input list.
    pub instances: u32,
    /// Instances skipped because they were not render-ready.
    pub not_ready: u32,
    /// Visible instances per frustum.
    pub visible: [u32; FRUSTUM_COUNT],
}

impl VisibilityStats {
    /// Instances culled from frustum `f`.
    #[must_use]
    pub fn culled(&self, f: VisibilityFrustum) -> u32 {
        self.instances
            .saturating_sub(self.not_ready)
            .saturating_sub(self.visible[f.index()])
    }
}

/// Produces, per frustum, the ordered list of visible instance indices.
///
/// Output lists keep their allocations between frames.
#[derive(Debug, Default)]
pub struct VisibilityFilter {
    visible: [Vec<usize>; FRUSTUM_COUNT],
    spheres: Vec<Option<BoundingSphere>>,
    stats: VisibilityStats,
}

impl VisibilityFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every frustum against every instance.
    ///
    /// Frustum `k` of `frustums` fills the list for `VisibilityFrustum::ALL[k]`.
    /// With `force_all_visible`, every render-ready instance is visible in
    /// every frustum.
    pub fn run<I: Cullable>(
        &mut self,
        frustums: &[Frustum; FRUSTUM_COUNT],
        instances: &[I],
        force_all_visible: bool,
    ) {
        // Spheres are computed once and shared by all frustums.
        self.spheres.clear();
        self.spheres
            .extend(instances.iter().map(Cullable::bounding_sphere));

        let not_ready = self.spheres.iter().filter(|s| s.is_none()).count();
        self.stats = VisibilityStats {
            instances: saturate(instances.len()),
            not_ready: saturate(not_ready),
            visible: [0; FRUSTUM_COUNT],
        };

        for (k, frustum) in frustums.iter().enumerate() {
            let visible = &mut self.visible[k];
            visible.clear();
            visible.extend(self.spheres.iter().enumerate().filter_map(|(i, sphere)| {
                let sphere = sphere.as_ref()?;
                (force_all_visible || frustum.test_sphere(sphere)).then_some(i)
            }));
            self.stats.visible[k] = saturate(visible.len());
        }
    }

    /// Visible instance indices for `f`, in input order.
    #[must_use]
    pub fn visible(&self, f: VisibilityFrustum) -> &[usize] {
        &self.visible[f.index()]
    }

    /// Counters from the last run.
    #[must_use]
    pub fn stats(&self) -> VisibilityStats {
        self.stats
    }
}

/// Filters a single frustum into `out`, keeping input order.
pub fn filter_visible<I: Cullable>(frustum: &Frustum, instances: &[I], out: &mut Vec<usize>) {
    out.clear();
    out.extend(instances.iter().enumerate().filter_map(|(i, instance)| {
        let sphere = instance.bounding_sphere()?;
        frustum.test_sphere(&sphere).then_some(i)
    }));
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat4, Vec3};
    use rand::{Rng, SeedableRng};

    fn box_frustum(half: f32) -> Frustum {
        Frustum::from_view_projection(&Mat4::orthographic_rh_gl(
            -half, half, -half, half, -half, half,
        ))
    }

    fn frustums() -> [Frustum; FRUSTUM_COUNT] {
        [
            box_frustum(10.0),
            box_frustum(1.0),
            box_frustum(2.0),
            box_frustum(4.0),
            box_frustum(8.0),
        ]
    }

    fn sphere_at(x: f32) -> Option<BoundingSphere> {
        Some(BoundingSphere::new(Vec3::new(x, 0.0, 0.0), 0.5))
    }

    #[test]
    fn test_filters_per_frustum() {
        let instances = [sphere_at(0.0), sphere_at(3.0), sphere_at(20.0), sphere_at(7.0)];
        let mut filter = VisibilityFilter::new();
        filter.run(&frustums(), &instances, false);

        assert_eq!(filter.visible(VisibilityFrustum::Main), &[0, 1, 3]);
        assert_eq!(filter.visible(VisibilityFrustum::Cascade0), &[0]);
        assert_eq!(filter.visible(VisibilityFrustum::Cascade2), &[0, 1]);
        assert_eq!(filter.visible(VisibilityFrustum::Cascade3), &[0, 1, 3]);
        assert_eq!(filter.stats().culled(VisibilityFrustum::Main), 1);
    }

    #[test]
    fn test_not_ready_instances_are_skipped() {
        let instances = [None, sphere_at(0.0), None];
        let mut filter = VisibilityFilter::new();
        filter.run(&frustums(), &instances, true);

        for f in VisibilityFrustum::ALL {
            assert_eq!(filter.visible(f), &[1]);
        }
        assert_eq!(filter.stats().not_ready, 2);
    }

    #[test]
    fn test_force_all_visible() {
        let instances = [sphere_at(100.0), sphere_at(-100.0)];
        let mut filter = VisibilityFilter::new();
        filter.run(&frustums(), &instances, true);
        assert_eq!(filter.visible(VisibilityFrustum::Cascade1), &[0, 1]);
    }

    #[test]
    fn test_repeated_runs_are_stable() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x00e1_b0e5);
        let instances: Vec<Option<BoundingSphere>> = (0..500)
            .map(|_| {
                rng.gen_bool(0.9).then(|| {
                    BoundingSphere::new(
                        Vec3::new(
                            rng.gen_range(-15.0..15.0),
                            rng.gen_range(-15.0..15.0),
                            rng.gen_range(-15.0..15.0),
                        ),
                        rng.gen_range(0.1..2.0),
                    )
                })
            })
            .collect();

        let mut filter = VisibilityFilter::new();
        filter.run(&frustums(), &instances, false);
        let first: Vec<Vec<usize>> = VisibilityFrustum::ALL
            .iter()
            .map(|&f| filter.visible(f).to_vec())
            .collect();

        for _ in 0..5 {
            filter.run(&frustums(), &instances, false);
            for (k, &f) in VisibilityFrustum::ALL.iter().enumerate() {
                assert_eq!(filter.visible(f), first[k].as_slice());
                assert!(filter.visible(f).windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn test_single_frustum_filter() {
        let instances = [sphere_at(0.0), sphere_at(5.0), None];
        let mut out = vec![99];
        filter_visible(&box_frustum(1.0), &instances, &mut out);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_cascade_lookup() {
        assert_eq!(VisibilityFrustum::cascade(0), VisibilityFrustum::Cascade0);
        assert_eq!(VisibilityFrustum::cascade(3).index(), 4);
    }
}
