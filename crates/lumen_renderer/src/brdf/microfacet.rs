//! GGX microfacet math and the rough dielectric model.

use std::f32::consts::{FRAC_1_PI, PI};

use lumen_math::{Color, Vec2, Vec3};

use super::{reflect, Brdf, Frame};
use crate::sampler::Sampler;

/// Roughness floor; keeps the distribution away from a true delta.
pub const MIN_ROUGHNESS: f32 = 1e-3;

/// Alpha floor. `α²` must stay well above f32 epsilon or `D` at `m = n`
/// divides by zero.
pub const MIN_ALPHA: f32 = 1e-3;

/// Below this, `|wo·m|` or a cosine is treated as zero.
const DENOM_EPSILON: f32 = 1e-6;

/// Perceptual roughness to GGX alpha (floored, squared, floored again).
#[inline]
pub fn roughness_to_alpha(roughness: f32) -> f32 {
    let r = roughness.clamp(MIN_ROUGHNESS, 1.0);
    (r * r).max(MIN_ALPHA)
}

/// Fresnel reflectance at normal incidence for a dielectric of the given IOR.
#[inline]
pub fn f0_from_ior(ior: f32) -> f32 {
    let r = (ior - 1.0) / (ior + 1.0);
    r * r
}

/// Schlick weight `(1 - cos θ)^5`.
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick Fresnel approximation.
#[inline]
pub fn schlick_fresnel(f0: Color, cos_theta: f32) -> Color {
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

/// GGX/Trowbridge-Reitz normal distribution `D(m)`.
#[inline]
pub fn ggx_d(n_dot_m: f32, alpha: f32) -> f32 {
    if n_dot_m <= 0.0 {
        return 0.0;
    }
    let c = n_dot_m.min(1.0);
    let a2 = alpha * alpha;
    // α²cos² + sin², with sin² as (1-c)(1+c) so it does not cancel near c = 1
    let denom = a2 * c * c + (1.0 - c) * (1.0 + c);
    a2 / (PI * denom * denom)
}

/// Smith-Schlick shadowing term for one direction, `k = √(2α²/π)`.
#[inline]
pub fn smith_schlick_g1(n_dot_v: f32, alpha: f32) -> f32 {
    let n_dot_v = n_dot_v.clamp(0.0, 1.0);
    let k = (2.0 * alpha * alpha / PI).sqrt();
    let denom = n_dot_v * (1.0 - k) + k;
    if denom <= DENOM_EPSILON {
        return 0.0;
    }
    n_dot_v / denom
}

/// Density of reflecting about a GGX-distributed half vector `m`.
#[inline]
pub fn ggx_pdf(n_dot_m: f32, wo_dot_m: f32, alpha: f32) -> f32 {
    let wo_dot_m = wo_dot_m.abs();
    if wo_dot_m < DENOM_EPSILON {
        return 0.0;
    }
    ggx_d(n_dot_m, alpha) * n_dot_m.max(0.0) / (4.0 * wo_dot_m)
}

/// Draw a local-space GGX half vector (z up).
///
/// `θ = acos(√((1-ξ1)/(1+(α²-1)ξ1)))`, `φ = 2πξ2`.
#[inline]
pub fn sample_ggx_half_vector(u: Vec2, alpha: f32) -> Vec3 {
    let a2 = alpha * alpha;
    let cos2 = ((1.0 - u.x) / (1.0 + (a2 - 1.0) * u.x)).clamp(0.0, 1.0);
    let cos_theta = cos2.sqrt();
    let sin_theta = (1.0 - cos2).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Half vector of a reflection pair, `None` when it is undefined.
#[inline]
pub(crate) fn half_vector(wi: Vec3, wo: Vec3) -> Option<Vec3> {
    let h = wi + wo;
    let len_sq = h.length_squared();
    (len_sq > DENOM_EPSILON).then(|| h / len_sq.sqrt())
}

/// Cook-Torrance specular term `D·G·F / (4 |wi·n| |wo·n|)`.
///
/// `alpha` shapes the distribution, `alpha_g` the shadowing; they are equal
/// for the plain microfacet model.
pub(crate) fn cook_torrance(
    wi: Vec3,
    wo: Vec3,
    frame: &Frame,
    alpha: f32,
    alpha_g: f32,
    f0: Color,
) -> Color {
    let cos_i = frame.cos_theta(wi);
    let cos_o = frame.cos_theta(wo);
    if cos_i <= DENOM_EPSILON || cos_o <= DENOM_EPSILON {
        return Color::ZERO;
    }
    let Some(m) = half_vector(wi, wo) else {
        return Color::ZERO;
    };

    let d = ggx_d(frame.cos_theta(m), alpha);
    let g = smith_schlick_g1(cos_i, alpha_g) * smith_schlick_g1(cos_o, alpha_g);
    let f = schlick_fresnel(f0, wo.dot(m).clamp(0.0, 1.0));

    f * (d * g / (4.0 * cos_i * cos_o))
}

/// Density of the GGX specular lobe at `wo`.
pub(crate) fn specular_pdf(wi: Vec3, wo: Vec3, frame: &Frame, alpha: f32) -> f32 {
    match half_vector(wi, wo) {
        Some(m) => ggx_pdf(frame.cos_theta(m), wo.dot(m), alpha),
        None => 0.0,
    }
}

/// Draw a direction from the GGX specular lobe.
pub(crate) fn sample_specular(sampler: &mut dyn Sampler, wi: Vec3, frame: &Frame, alpha: f32) -> Vec3 {
    let m = frame.to_world(sample_ggx_half_vector(sampler.sample_2d(), alpha));
    reflect(-wi, m)
}

/// Rough opaque dielectric/conductor: GGX specular plus a Lambertian term
/// for the non-metal fraction. Sampling follows the specular lobe only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoughDielectric {
    pub base_color: Color,
    pub metallic: f32,
    pub alpha: f32,
    /// Normal-incidence Fresnel, IOR-derived and tinted toward the base color
    /// by `metallic`
    pub f0: Color,
}

impl RoughDielectric {
    pub fn new(base_color: Color, metallic: f32, roughness: f32, ior: f32) -> Self {
        let metallic = metallic.clamp(0.0, 1.0);
        let f0 = Color::splat(f0_from_ior(ior)).lerp(base_color, metallic);
        Self {
            base_color,
            metallic,
            alpha: roughness_to_alpha(roughness),
            f0,
        }
    }
}

impl Brdf for RoughDielectric {
    fn sample(&self, sampler: &mut dyn Sampler, wi: Vec3, frame: &Frame) -> Vec3 {
        sample_specular(sampler, wi, frame, self.alpha)
    }

    fn evaluate(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> Color {
        if frame.cos_theta(wi) <= 0.0 || frame.cos_theta(wo) <= 0.0 {
            return Color::ZERO;
        }
        let specular = cook_torrance(wi, wo, frame, self.alpha, self.alpha, self.f0);
        let diffuse = self.base_color * ((1.0 - self.metallic) * FRAC_1_PI);
        specular + diffuse
    }

    fn pdf(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> f32 {
        specular_pdf(wi, wo, frame, self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brdf::test_util::{albedo, cone_probabilities, uniform_sphere};
    use crate::sampler::WhiteNoiseSampler;

    #[test]
    fn test_roughness_floor() {
        assert_eq!(roughness_to_alpha(0.0), MIN_ALPHA);
        assert_eq!(roughness_to_alpha(0.01), MIN_ALPHA);
        assert_eq!(roughness_to_alpha(0.5), 0.25);
        assert!(ggx_d(1.0, roughness_to_alpha(0.0)).is_finite());
        assert!(ggx_pdf(1.0, 1.0, roughness_to_alpha(0.0)).is_finite());
    }

    #[test]
    fn test_near_smooth_metal_keeps_every_sample() {
        let frame = Frame::from_normal(Vec3::Z);
        let wi = Vec3::new(0.0, 0.6, 0.8);
        let reference = albedo(&RoughDielectric::new(Color::ONE, 1.0, 0.05, 1.5), wi, &frame, 20_000, 21);

        for roughness in [0.0, 0.005, 0.01, 0.02] {
            let brdf = RoughDielectric::new(Color::ONE, 1.0, roughness, 1.5);
            let mut sampler = WhiteNoiseSampler::new(21);
            let dropped = (0..20_000)
                .filter(|_| brdf.sample_contribution(&mut sampler, wi, &frame).is_none())
                .count();
            assert_eq!(dropped, 0, "roughness {}", roughness);

            let a = albedo(&brdf, wi, &frame, 20_000, 21);
            assert!((a - reference).abs().max_element() < 0.03, "roughness {}: {:?} vs {:?}", roughness, a, reference);
        }
    }

    #[test]
    fn test_schlick() {
        assert!(schlick_weight(1.0).abs() < 1e-6);
        assert!((schlick_weight(0.0) - 1.0).abs() < 1e-6);
        assert!((f0_from_ior(1.5) - 0.04).abs() < 1e-6);

        let f = schlick_fresnel(Color::splat(0.04), 0.0);
        assert!((f - Color::ONE).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_ggx_d_normalized() {
        // ∫ D(m) (m·n) dω = 1 over the hemisphere
        let mut sampler = WhiteNoiseSampler::new(77);
        for alpha in [0.3, 0.5, 1.0] {
            let n = 400_000;
            let sum: f32 = (0..n)
                .map(|_| uniform_sphere(&mut sampler))
                .map(|m| ggx_d(m.z, alpha) * m.z.max(0.0))
                .sum();
            let integral = sum * 4.0 * PI / n as f32;
            assert!((integral - 1.0).abs() < 0.05, "alpha {}: {}", alpha, integral);
        }
    }

    #[test]
    fn test_g1_bounds() {
        for alpha in [0.01, 0.3, 1.0] {
            for cos in [0.0, 0.1, 0.5, 1.0] {
                let g = smith_schlick_g1(cos, alpha);
                assert!((0.0..=1.0 + 1e-6).contains(&g));
            }
        }
    }

    #[test]
    fn test_evaluate_non_negative() {
        let frame = Frame::from_normal(Vec3::Z);
        let brdf = RoughDielectric::new(Color::new(0.9, 0.5, 0.1), 0.3, 0.4, 1.5);
        let mut sampler = WhiteNoiseSampler::new(5);

        for _ in 0..10_000 {
            let wi = uniform_sphere(&mut sampler);
            let wo = uniform_sphere(&mut sampler);
            let value = brdf.evaluate(wi, wo, &frame);
            assert!(value.min_element() >= 0.0 && value.is_finite());
            assert!(brdf.pdf(wi, wo, &frame) >= 0.0);
        }
    }

    #[test]
    fn test_metal_energy_conservation() {
        let frame = Frame::from_normal(Vec3::Z);
        for roughness in [0.2, 0.5, 0.9] {
            let brdf = RoughDielectric::new(Color::ONE, 1.0, roughness, 1.5);
            for wi in [Vec3::Z, Vec3::new(0.6, 0.0, 0.8)] {
                let a = albedo(&brdf, wi, &frame, 50_000, 9);
                assert!(a.max_element() <= 1.02, "roughness {}: {:?}", roughness, a);
                assert!(a.min_element() > 0.5);
            }
        }
    }

    #[test]
    fn test_pdf_matches_histogram() {
        let frame = Frame::from_normal(Vec3::Z);
        let brdf = RoughDielectric::new(Color::ONE, 1.0, 0.6, 1.5);
        let wi = Vec3::new(0.5, 0.0, 0.866).normalize();
        let mirror = reflect(-wi, Vec3::Z);

        for cos_cone in [0.95, 0.7] {
            let (empirical, analytic) = cone_probabilities(&brdf, wi, &frame, mirror, cos_cone, 300_000);
            assert!(
                (empirical - analytic).abs() < 0.02,
                "cone {}: {} vs {}",
                cos_cone,
                empirical,
                analytic
            );
        }
    }

    #[test]
    fn test_smooth_lobe_concentrates_at_mirror_direction() {
        let frame = Frame::from_normal(Vec3::Z);
        let brdf = RoughDielectric::new(Color::ONE, 1.0, 0.05, 1.5);
        let wi = Vec3::new(0.0, 0.6, 0.8);
        let mirror = reflect(-wi, Vec3::Z);
        let mut sampler = WhiteNoiseSampler::new(8);

        for _ in 0..100 {
            let wo = brdf.sample(&mut sampler, wi, &frame);
            assert!(wo.dot(mirror) > 0.99);
        }
    }
}
