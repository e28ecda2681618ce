//! Lambertian (ideal diffuse) reflection.

use std::f32::consts::{FRAC_1_PI, PI};

use lumen_math::{Color, Vec3};

use super::{cosine_sample_hemisphere, Brdf, Frame};
use crate::sampler::Sampler;

/// Lambertian diffuse with cosine-weighted importance sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lambertian {
    pub base_color: Color,
}

impl Lambertian {
    pub fn new(base_color: Color) -> Self {
        Self { base_color }
    }
}

impl Brdf for Lambertian {
    fn sample(&self, sampler: &mut dyn Sampler, _wi: Vec3, frame: &Frame) -> Vec3 {
        frame.to_world(cosine_sample_hemisphere(sampler.sample_2d()))
    }

    fn evaluate(&self, _wi: Vec3, wo: Vec3, frame: &Frame) -> Color {
        if frame.cos_theta(wo) <= 0.0 {
            return Color::ZERO;
        }
        self.base_color * FRAC_1_PI
    }

    fn pdf(&self, _wi: Vec3, wo: Vec3, frame: &Frame) -> f32 {
        frame.cos_theta(wo).max(0.0) * FRAC_1_PI
    }
}

/// Lambertian diffuse sampled uniformly over the hemisphere.
///
/// Draws points by rejection inside the unit sphere and flips them to the
/// upper hemisphere. Same reflectance as [`Lambertian`], higher variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformLambertian {
    pub base_color: Color,
}

impl UniformLambertian {
    pub fn new(base_color: Color) -> Self {
        Self { base_color }
    }
}

impl Brdf for UniformLambertian {
    fn sample(&self, sampler: &mut dyn Sampler, _wi: Vec3, frame: &Frame) -> Vec3 {
        let local = loop {
            let v = Vec3::new(
                sampler.sample_range(-1.0, 1.0),
                sampler.sample_range(-1.0, 1.0),
                sampler.sample_range(-1.0, 1.0),
            );
            let len_sq = v.length_squared();
            if len_sq > 1e-8 && len_sq <= 1.0 && v.z != 0.0 {
                break v / len_sq.sqrt();
            }
        };

        let local = if local.z < 0.0 { -local } else { local };
        frame.to_world(local)
    }

    fn evaluate(&self, _wi: Vec3, wo: Vec3, frame: &Frame) -> Color {
        if frame.cos_theta(wo) <= 0.0 {
            return Color::ZERO;
        }
        self.base_color * FRAC_1_PI
    }

    fn pdf(&self, _wi: Vec3, wo: Vec3, frame: &Frame) -> f32 {
        if frame.cos_theta(wo) <= 0.0 {
            return 0.0;
        }
        0.5 / PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brdf::test_util::{albedo, cone_probabilities};
    use crate::sampler::WhiteNoiseSampler;

    fn frame() -> Frame {
        Frame::from_normal(Vec3::new(0.2, 0.9, 0.1).normalize())
    }

    #[test]
    fn test_samples_in_upper_hemisphere() {
        let f = frame();
        let mut sampler = WhiteNoiseSampler::new(11);
        for brdf in [
            &Lambertian::new(Color::ONE) as &dyn Brdf,
            &UniformLambertian::new(Color::ONE),
        ] {
            for _ in 0..10_000 {
                let wo = brdf.sample(&mut sampler, f.normal, &f);
                assert!(f.cos_theta(wo) > 0.0);
                assert!((wo.length() - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_cosine_weighted_weight_is_albedo() {
        let f = frame();
        let brdf = Lambertian::new(Color::new(0.25, 0.5, 0.75));
        let mut sampler = WhiteNoiseSampler::new(3);

        // brdf * cos / pdf cancels to the base color for every sample
        for _ in 0..1000 {
            let s = brdf.sample_contribution(&mut sampler, f.normal, &f).unwrap();
            assert!((s.weight - brdf.base_color).abs().max_element() < 1e-4);
        }
    }

    #[test]
    fn test_energy_conservation() {
        let f = frame();
        let wi = f.to_world(Vec3::new(0.5, 0.0, 0.866));

        let a = albedo(&Lambertian::new(Color::ONE), wi, &f, 20_000, 1);
        assert!(a.max_element() <= 1.0 + 1e-3);
        assert!(a.min_element() > 0.99);

        let a = albedo(&UniformLambertian::new(Color::ONE), wi, &f, 100_000, 2);
        assert!((a - Color::ONE).abs().max_element() < 0.02, "albedo = {:?}", a);
    }

    #[test]
    fn test_pdf_matches_histogram() {
        let f = frame();
        // Narrow cone around the normal, and a wide one
        for cos_cone in [0.9, 0.3] {
            let (empirical, analytic) = cone_probabilities(
                &Lambertian::new(Color::ONE),
                f.normal,
                &f,
                f.normal,
                cos_cone,
                200_000,
            );
            // Cosine-weighted: P(cos θ > c) = 1 - c²
            let exact = 1.0 - cos_cone * cos_cone;
            assert!((empirical - exact).abs() < 0.01, "{} vs {}", empirical, exact);
            assert!((analytic - exact).abs() < 0.02, "{} vs {}", analytic, exact);
        }

        let (empirical, analytic) = cone_probabilities(
            &UniformLambertian::new(Color::ONE),
            f.normal,
            &f,
            f.normal,
            0.5,
            200_000,
        );
        // Uniform hemisphere: P(cos θ > c) = 1 - c
        assert!((empirical - 0.5).abs() < 0.01);
        assert!((analytic - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_below_horizon_is_black() {
        let f = frame();
        let below = -f.normal;

        assert_eq!(Lambertian::new(Color::ONE).evaluate(f.normal, below, &f), Color::ZERO);
        assert_eq!(Lambertian::new(Color::ONE).pdf(f.normal, below, &f), 0.0);
        assert_eq!(UniformLambertian::new(Color::ONE).pdf(f.normal, below, &f), 0.0);
    }
}
