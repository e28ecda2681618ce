//! Reflectance models (BRDFs) with importance sampling.
//!
//! Every model implements [`Brdf`]: draw an outgoing direction, evaluate the
//! reflectance for a direction pair, and report the sampling density. All
//! directions are unit vectors; `wi` points back toward the viewer and the
//! shading frame's normal lies on the same side as `wi`. Surfaces are opaque,
//! so directions below the shading hemisphere carry no energy.

use std::f32::consts::PI;

use lumen_math::{Color, Vec2, Vec3};

use crate::sampler::Sampler;

mod lambertian;
mod microfacet;
mod mirror;
mod principled;
mod surface;

pub use lambertian::{Lambertian, UniformLambertian};
pub use microfacet::{
    f0_from_ior, ggx_d, ggx_pdf, roughness_to_alpha, sample_ggx_half_vector, schlick_fresnel,
    schlick_weight, smith_schlick_g1, RoughDielectric, MIN_ALPHA,
    MIN_ROUGHNESS,
};
pub use mirror::SmoothMirror;
pub use principled::Principled;
pub use surface::{BrdfModel, SurfaceBrdf};

/// An outgoing direction together with its throughput weight
/// (`brdf * |cos| / pdf`, or the lobe value for singular lobes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrdfSample {
    pub wo: Vec3,
    pub weight: Color,
}

/// Common contract of every reflectance model.
pub trait Brdf: Send + Sync {
    /// Draw an outgoing direction from the model's importance distribution.
    fn sample(&self, sampler: &mut dyn Sampler, wi: Vec3, frame: &Frame) -> Vec3;

    /// Reflectance for the direction pair, independent of how `wo` was drawn.
    fn evaluate(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> Color;

    /// Density of [`Brdf::sample`] at `wo`.
    fn pdf(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> f32;

    /// Dirac lobes have no meaningful density and must never enter a
    /// composite pdf.
    fn is_singular(&self) -> bool {
        false
    }

    /// Sample a direction and compute the throughput weight for it.
    ///
    /// Returns `None` when the sampled direction is unusable (below the
    /// surface, zero density, non-finite weight); the path ends there.
    fn sample_contribution(
        &self,
        sampler: &mut dyn Sampler,
        wi: Vec3,
        frame: &Frame,
    ) -> Option<BrdfSample> {
        let wo = self.sample(sampler, wi, frame);
        let cos_o = frame.cos_theta(wo);
        if cos_o <= 0.0 {
            return None;
        }

        if self.is_singular() {
            return Some(BrdfSample {
                wo,
                weight: self.evaluate(wi, wo, frame),
            });
        }

        let pdf = self.pdf(wi, wo, frame);
        if pdf <= 0.0 || !pdf.is_finite() {
            return None;
        }

        let weight = self.evaluate(wi, wo, frame) * (cos_o / pdf);
        weight.is_finite().then_some(BrdfSample { wo, weight })
    }
}

/// Orthonormal shading frame (tangent, bitangent, normal).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Build a frame around a unit normal (Duff et al. branchless basis).
    pub fn from_normal(n: Vec3) -> Self {
        let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;

        let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

        Self {
            tangent,
            bitangent,
            normal: n,
        }
    }

    /// Build a frame from a unit normal and an approximate tangent.
    ///
    /// The tangent is orthogonalised against the normal; a missing or
    /// parallel tangent falls back to [`Frame::from_normal`].
    pub fn from_normal_tangent(n: Vec3, t: Vec3) -> Self {
        let t = t - n * n.dot(t);
        let len_sq = t.length_squared();
        if len_sq < 1e-12 || !len_sq.is_finite() {
            return Self::from_normal(n);
        }

        let tangent = t / len_sq.sqrt();
        Self {
            tangent,
            bitangent: n.cross(tangent),
            normal: n,
        }
    }

    /// Transform a local-space direction (z = normal) to world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        v.x * self.tangent + v.y * self.bitangent + v.z * self.normal
    }

    /// Transform a world-space direction into the frame.
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }

    /// Cosine between `v` and the frame normal.
    #[inline]
    pub fn cos_theta(&self, v: Vec3) -> f32 {
        v.dot(self.normal)
    }
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Cosine-weighted direction on the local upper hemisphere (z up).
///
/// `θ = acos(√ξ1)` with `ξ1` taken as `1 - u.x`, so `cos θ > 0` for any
/// sample in `[0, 1)` and the density never vanishes at a drawn direction.
#[inline]
pub fn cosine_sample_hemisphere(u: Vec2) -> Vec3 {
    let cos_theta = (1.0 - u.x).clamp(0.0, 1.0).sqrt();
    let sin_theta = u.x.clamp(0.0, 1.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}
