//! Pinhole camera for primary ray generation.

use lumen_math::{Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    /// Width / height
    pub aspect_ratio: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y: 60.0,
            aspect_ratio: 1.0,
        }
    }
}

impl Camera {
    /// Camera at `position` looking towards `target`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            position,
            forward: (target - position).normalize_or_zero(),
            up,
            ..Default::default()
        }
    }

    /// Set vertical field of view (degrees).
    pub fn with_fov(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    /// Set the aspect ratio from an image size.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.aspect_ratio = width as f32 / height.max(1) as f32;
        self
    }

    /// Image plane one unit in front of the camera.
    pub fn view_pyramid(&self) -> ViewPyramid {
        let forward = self.forward.normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);

        let viewport_height = 2.0 * (self.fov_y.to_radians() * 0.5).tan();
        let viewport_width = viewport_height * self.aspect_ratio;

        // Image rows run top to bottom
        let view_u = right * viewport_width;
        let view_v = -up * viewport_height;

        let top_left = self.position + forward - 0.5 * (view_u + view_v);
        ViewPyramid {
            origin: self.position,
            top_left,
            top_right: top_left + view_u,
            bottom_left: top_left + view_v,
        }
    }
}

/// Camera origin plus three corners of the image plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPyramid {
    pub origin: Vec3,
    pub top_left: Vec3,
    pub top_right: Vec3,
    pub bottom_left: Vec3,
}

impl ViewPyramid {
    /// Primary ray through image coordinates `(u, v)` in `[0, 1]²`,
    /// `(0, 0)` being the top-left corner.
    #[inline]
    pub fn ray(&self, u: f32, v: f32) -> Ray {
        let target = self.top_left
            + u * (self.top_right - self.top_left)
            + v * (self.bottom_left - self.top_left);
        Ray::new(self.origin, (target - self.origin).normalize())
    }
}
