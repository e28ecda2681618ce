//! Combined diffuse + specular model with one-sample MIS.

use std::f32::consts::FRAC_1_PI;

use lumen_math::{luma, Color, Vec3};

use super::microfacet::{
    cook_torrance, f0_from_ior, half_vector, roughness_to_alpha, sample_specular, schlick_fresnel,
    schlick_weight, specular_pdf,
};
use super::{cosine_sample_hemisphere, Brdf, Frame};
use crate::sampler::Sampler;

/// Disney-style principled BRDF.
///
/// A Burley diffuse lobe weighted by `1 - metallic` and a GGX specular lobe.
/// One lobe is picked per sample with probabilities `(1 - metallic, luma(F))`
/// normalised; [`Brdf::pdf`] returns the composite density of both lobes, so
/// the default `sample_contribution` yields the one-sample MIS weight
/// `brdf·cos / composite_pdf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Principled {
    pub base_color: Color,
    pub metallic: f32,
    /// Perceptual roughness after flooring
    pub roughness: f32,
    /// Distribution and sampling alpha
    pub alpha: f32,
    /// Shadowing alpha, `(0.5 + 0.5α)²`
    pub alpha_g: f32,
    pub f0: Color,
}

impl Principled {
    pub fn new(base_color: Color, metallic: f32, roughness: f32, ior: f32) -> Self {
        let metallic = metallic.clamp(0.0, 1.0);
        let alpha = roughness_to_alpha(roughness);
        let squished = 0.5 + 0.5 * alpha;
        Self {
            base_color,
            metallic,
            roughness: alpha.sqrt(),
            alpha,
            alpha_g: squished * squished,
            f0: Color::splat(f0_from_ior(ior)).lerp(base_color, metallic),
        }
    }

    /// Normalised `(diffuse, specular)` selection probabilities for `wi`.
    pub fn lobe_weights(&self, wi: Vec3, frame: &Frame) -> (f32, f32) {
        let diffuse = 1.0 - self.metallic;
        let specular = luma(schlick_fresnel(self.f0, frame.cos_theta(wi).clamp(0.0, 1.0)));
        let total = diffuse + specular;
        if total <= 0.0 || !total.is_finite() {
            return (1.0, 0.0);
        }
        (diffuse / total, specular / total)
    }

    /// Density of the cosine-weighted diffuse lobe alone.
    pub fn diffuse_pdf(&self, wo: Vec3, frame: &Frame) -> f32 {
        frame.cos_theta(wo).max(0.0) * FRAC_1_PI
    }

    /// Density of the GGX specular lobe alone.
    pub fn specular_pdf(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> f32 {
        specular_pdf(wi, wo, frame, self.alpha)
    }

    fn diffuse(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> Color {
        let cos_i = frame.cos_theta(wi);
        let cos_o = frame.cos_theta(wo);
        let cos_d = half_vector(wi, wo).map_or(0.0, |h| wo.dot(h).clamp(0.0, 1.0));

        let fd90 = 0.5 + 2.0 * self.roughness * cos_d * cos_d;
        let retro_i = 1.0 + (fd90 - 1.0) * schlick_weight(cos_i);
        let retro_o = 1.0 + (fd90 - 1.0) * schlick_weight(cos_o);

        self.base_color * (FRAC_1_PI * retro_i * retro_o * (1.0 - self.metallic))
    }
}

impl Brdf for Principled {
    fn sample(&self, sampler: &mut dyn Sampler, wi: Vec3, frame: &Frame) -> Vec3 {
        let (diffuse_weight, _) = self.lobe_weights(wi, frame);
        if sampler.sample() < diffuse_weight {
            frame.to_world(cosine_sample_hemisphere(sampler.sample_2d()))
        } else {
            sample_specular(sampler, wi, frame, self.alpha)
        }
    }

    fn evaluate(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> Color {
        if frame.cos_theta(wi) <= 0.0 || frame.cos_theta(wo) <= 0.0 {
            return Color::ZERO;
        }
        self.diffuse(wi, wo, frame)
            + cook_torrance(wi, wo, frame, self.alpha, self.alpha_g, self.f0)
    }

    fn pdf(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> f32 {
        let (diffuse_weight, specular_weight) = self.lobe_weights(wi, frame);
        diffuse_weight * self.diffuse_pdf(wo, frame)
            + specular_weight * self.specular_pdf(wi, wo, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brdf::reflect;
    use crate::brdf::test_util::{albedo, cone_probabilities, uniform_sphere};
    use crate::sampler::WhiteNoiseSampler;

    #[test]
    fn test_squished_geometry_roughness() {
        let brdf = Principled::new(Color::ONE, 0.0, 0.5, 1.5);
        assert!((brdf.alpha - 0.25).abs() < 1e-6);
        assert!((brdf.alpha_g - 0.625 * 0.625).abs() < 1e-6);
    }

    #[test]
    fn test_lobe_weights_normalised() {
        let frame = Frame::from_normal(Vec3::Z);
        let wi = Vec3::new(0.3, 0.0, 0.954).normalize();

        for metallic in [0.0, 0.3, 1.0] {
            let brdf = Principled::new(Color::new(0.8, 0.4, 0.2), metallic, 0.4, 1.5);
            let (d, s) = brdf.lobe_weights(wi, &frame);
            assert!((d + s - 1.0).abs() < 1e-5);
            assert!(d >= 0.0 && s >= 0.0);
        }

        // Pure metal never picks the diffuse lobe
        let metal = Principled::new(Color::ONE, 1.0, 0.4, 1.5);
        assert_eq!(metal.lobe_weights(wi, &frame).0, 0.0);

        // Black metal seen head-on has no Fresnel, selection falls back to diffuse
        let black = Principled::new(Color::ZERO, 1.0, 0.4, 1.5);
        assert_eq!(black.lobe_weights(Vec3::Z, &frame), (1.0, 0.0));
    }

    #[test]
    fn test_evaluate_non_negative() {
        let frame = Frame::from_normal(Vec3::Z);
        let mut sampler = WhiteNoiseSampler::new(21);

        for (metallic, roughness) in [(0.0, 1.0), (0.5, 0.3), (1.0, 0.05)] {
            let brdf = Principled::new(Color::new(0.7, 0.6, 0.5), metallic, roughness, 1.5);
            for _ in 0..5000 {
                let wi = uniform_sphere(&mut sampler);
                let wo = uniform_sphere(&mut sampler);
                let value = brdf.evaluate(wi, wo, &frame);
                assert!(value.min_element() >= 0.0 && value.is_finite());
                assert!(brdf.pdf(wi, wo, &frame) >= 0.0);
            }
        }
    }

    #[test]
    fn test_composite_pdf_matches_histogram() {
        let frame = Frame::from_normal(Vec3::Z);
        let brdf = Principled::new(Color::new(0.9, 0.7, 0.5), 0.5, 0.5, 1.5);
        let wi = Vec3::new(0.5, 0.0, 0.866).normalize();

        for (axis, cos_cone) in [(Vec3::Z, 0.8), (reflect(-wi, Vec3::Z), 0.9)] {
            let (empirical, analytic) = cone_probabilities(&brdf, wi, &frame, axis, cos_cone, 300_000);
            assert!(
                (empirical - analytic).abs() < 0.02,
                "{} vs {}",
                empirical,
                analytic
            );
        }
    }

    #[test]
    fn test_composite_pdf_uses_both_lobes() {
        let frame = Frame::from_normal(Vec3::Z);
        let brdf = Principled::new(Color::ONE, 0.5, 0.5, 1.5);
        let wi = Vec3::new(0.0, 0.6, 0.8);
        let wo = Vec3::new(0.3, -0.3, 0.9).normalize();

        let (d, s) = brdf.lobe_weights(wi, &frame);
        let expected = d * brdf.diffuse_pdf(wo, &frame) + s * brdf.specular_pdf(wi, wo, &frame);
        assert!((brdf.pdf(wi, wo, &frame) - expected).abs() < 1e-6);
        assert!(brdf.diffuse_pdf(wo, &frame) > 0.0 && brdf.specular_pdf(wi, wo, &frame) > 0.0);
    }

    #[test]
    fn test_metal_energy_conservation() {
        let frame = Frame::from_normal(Vec3::Z);
        for roughness in [0.1, 0.5, 1.0] {
            let brdf = Principled::new(Color::ONE, 1.0, roughness, 1.5);
            let a = albedo(&brdf, Vec3::new(0.0, 0.5, 0.866).normalize(), &frame, 50_000, 4);
            assert!(a.max_element() <= 1.02, "roughness {}: {:?}", roughness, a);
        }
    }

    #[test]
    fn test_near_smooth_lobe_keeps_every_sample() {
        let frame = Frame::from_normal(Vec3::Z);
        let wi = Vec3::new(0.0, 0.6, 0.8);
        let reference = albedo(&Principled::new(Color::ONE, 0.9, 0.05, 1.5), wi, &frame, 20_000, 13);

        for roughness in [0.0, 0.005, 0.01] {
            let brdf = Principled::new(Color::ONE, 0.9, roughness, 1.5);
            let mut sampler = WhiteNoiseSampler::new(13);
            let dropped = (0..20_000)
                .filter(|_| brdf.sample_contribution(&mut sampler, wi, &frame).is_none())
                .count();
            assert_eq!(dropped, 0, "roughness {}", roughness);

            let a = albedo(&brdf, wi, &frame, 20_000, 13);
            assert!((a - reference).abs().max_element() < 0.03, "roughness {}: {:?} vs {:?}", roughness, a, reference);
        }
    }

    #[test]
    fn test_dielectric_albedo_bounded() {
        // Burley diffuse is not strictly energy conserving at grazing angles;
        // at moderate incidence it stays close to the base color.
        let frame = Frame::from_normal(Vec3::Z);
        let brdf = Principled::new(Color::splat(0.5), 0.0, 0.5, 1.5);
        let a = albedo(&brdf, Vec3::new(0.0, 0.5, 0.866).normalize(), &frame, 100_000, 6);
        assert!(a.max_element() < 1.0, "{:?}", a);
        assert!(a.min_element() > 0.3, "{:?}", a);
    }
}
