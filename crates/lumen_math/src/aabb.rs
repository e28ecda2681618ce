use bytemuck::{Pod, Zeroable};

use crate::{Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// Boxes are kept tight: flat boxes (e.g. around an axis-aligned triangle) are
/// legal and the slab test treats their boundary as inside.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub const fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::from_min_max(min, max)
    }

    /// Create an AABB from its minimum and maximum corners (no reordering).
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            x: Interval::new(min.x, max.x),
            y: Interval::new(min.y, max.y),
            z: Interval::new(min.z, max.z),
        }
    }

    /// Smallest box containing all given points, `EMPTY` for no points.
    pub fn from_point_iter(points: impl IntoIterator<Item = Vec3>) -> Self {
        points
            .into_iter()
            .fold(Aabb::EMPTY, |acc, p| acc.grow_point(p))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow this box to include a point.
    pub fn grow_point(&self, p: Vec3) -> Self {
        Self {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min_point(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max_point(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// True if the box contains nothing (any axis has min > max).
    pub fn is_empty(&self) -> bool {
        self.x.min > self.x.max || self.y.min > self.y.max || self.z.min > self.z.max
    }

    /// True if `other` lies entirely inside this box.
    pub fn encloses(&self, other: &Aabb) -> bool {
        self.x.encloses(&other.x) && self.y.encloses(&other.y) && self.z.encloses(&other.z)
    }

    /// Slab test returning the entry distance of the ray into the box.
    ///
    /// `inv_dir` is `ray.inv_direction()`, hoisted out by callers that test
    /// many boxes with the same ray. Returns `None` when the ray misses the box
    /// or the overlap lies outside `[t_min, t_max]`. NaNs produced by
    /// `0 * inf` (origin on a slab plane, direction parallel to it) are
    /// discarded by `f32::max`/`f32::min`.
    #[inline]
    pub fn hit_distance(&self, ray: &Ray, inv_dir: Vec3, t_min: f32, t_max: f32) -> Option<f32> {
        let mut t_enter = t_min;
        let mut t_exit = t_max;

        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let origin = ray.origin[axis];
            let inv = inv_dir[axis];

            let t0 = (slab.min - origin) * inv;
            let t1 = (slab.max - origin) * inv;
            let (near, far) = if inv < 0.0 { (t1, t0) } else { (t0, t1) };

            t_enter = near.max(t_enter);
            t_exit = far.min(t_exit);
            if t_exit < t_enter {
                return None;
            }
        }

        Some(t_enter)
    }

    /// Test if a ray intersects this AABB within the given interval.
    ///
    /// Uses the slab method - efficient ray-box intersection test.
    pub fn hit(&self, r: &Ray, ray_t: Interval) -> bool {
        self.hit_distance(r, r.inv_direction(), ray_t.min, ray_t.max)
            .is_some()
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min_point() + self.max_point()) * 0.5
    }

    /// Surface area of the box, zero for an empty box.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.max_point() - self.min_point();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.x.min, 0.0);
        assert_eq!(aabb.x.max, 10.0);
        assert_eq!(aabb.y.min, 0.0);
        assert_eq!(aabb.y.max, 10.0);
        assert_eq!(aabb.z.min, 0.0);
        assert_eq!(aabb.z.max, 10.0);
    }

    #[test]
    fn test_aabb_surrounding() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0));
        let box2 = Aabb::from_points(Vec3::new(3.0, 3.0, 3.0), Vec3::new(10.0, 10.0, 10.0));
        let surrounding = Aabb::surrounding(&box1, &box2);

        assert_eq!(surrounding.x.min, 0.0);
        assert_eq!(surrounding.x.max, 10.0);
        assert!(surrounding.encloses(&box1));
        assert!(surrounding.encloses(&box2));
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        // Ray pointing at center
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.hit(&ray, Interval::new(0.0, 100.0)));

        // Ray pointing away
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));

        // Ray missing the box
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));
    }

    #[test]
    fn test_hit_distance_reports_entry() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        let t = aabb.hit_distance(&ray, ray.inv_direction(), 0.0, 100.0).unwrap();
        assert!((t - 4.0).abs() < 1e-6);

        // Box beyond t_max is pruned
        assert!(aabb.hit_distance(&ray, ray.inv_direction(), 0.0, 3.0).is_none());

        // Origin inside: entry clamps to t_min
        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        let t = aabb.hit_distance(&inside, inside.inv_direction(), 0.0, 100.0).unwrap();
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_flat_box_is_hit() {
        // Box around a triangle lying in the z=0 plane
        let flat = Aabb::from_points(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), -Vec3::Z);

        let t = flat.hit_distance(&ray, ray.inv_direction(), 0.0, f32::MAX).unwrap();
        assert!((t - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_ray_on_slab_plane_is_not_nan() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        // Travels along the x=0 face plane
        let ray = Ray::new(Vec3::new(0.0, 0.5, -1.0), Vec3::Z);

        let t = aabb.hit_distance(&ray, ray.inv_direction(), 0.0, 10.0);
        assert!(matches!(t, Some(t) if t.is_finite()));
    }

    #[test]
    fn test_empty_box_never_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(Aabb::EMPTY.hit_distance(&ray, ray.inv_direction(), 0.0, f32::MAX).is_none());
        assert_eq!(Aabb::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn test_aabb_centroid_and_area() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));

        assert_eq!(aabb.centroid(), Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(aabb.surface_area(), 600.0);
    }

    #[test]
    fn test_aabb_longest_axis() {
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }

    #[test]
    fn test_from_point_iter() {
        let aabb = Aabb::from_point_iter([Vec3::new(1.0, -2.0, 0.5), Vec3::new(-1.0, 3.0, 0.0)]);

        assert_eq!(aabb.min_point(), Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max_point(), Vec3::new(1.0, 3.0, 0.5));
        assert!(Aabb::from_point_iter(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_aabb_layout_is_packed() {
        assert_eq!(std::mem::size_of::<Aabb>(), 24);
    }
}
