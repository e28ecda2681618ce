use crate::Vec3;

/// A ray in 3D space with an origin and a direction.
///
/// Directions are expected to be normalized by the code that creates the ray;
/// this is assumed, not enforced.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Component-wise reciprocal of the direction, used by slab tests.
    ///
    /// Zero components map to signed infinities instead of branching.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        self.direction.recip()
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        }
    }
}
