// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// RGB color type alias (linear radiance or reflectance, one channel per component).
pub type Color = Vec3;

/// Perceptual luminance of a linear color (Rec. 709 weights).
#[inline]
pub fn luma(c: Color) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}
