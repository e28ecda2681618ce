//! Per-material BRDF selection.

use lumen_core::Material;
use lumen_math::{Color, Vec3};
use serde::{Deserialize, Serialize};

use super::{Brdf, Frame, Lambertian, Principled, RoughDielectric, SmoothMirror, UniformLambertian};
use crate::sampler::Sampler;

/// Which reflectance model materials are translated into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrdfModel {
    /// Everything is cosine-sampled diffuse
    Lambertian,
    /// Everything is diffuse, sampled uniformly over the hemisphere
    UniformLambertian,
    /// GGX specular plus a Lambertian term
    Microfacet,
    /// Burley diffuse + GGX specular with MIS lobe selection
    #[default]
    Principled,
}

/// The reflectance model of one material, built once per scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceBrdf {
    Lambertian(Lambertian),
    UniformLambertian(UniformLambertian),
    Mirror(SmoothMirror),
    Microfacet(RoughDielectric),
    Principled(Principled),
}

impl SurfaceBrdf {
    /// Translate a material under the given model.
    ///
    /// Perfectly smooth metals become [`SmoothMirror`] in the specular models;
    /// the GGX distribution is never evaluated at zero roughness.
    pub fn from_material(material: &Material, model: BrdfModel) -> Self {
        let base = material.base_color;
        let smooth_metal = material.metallic >= 1.0 && material.roughness <= 0.0;

        match model {
            BrdfModel::Lambertian => Self::Lambertian(Lambertian::new(base)),
            BrdfModel::UniformLambertian => Self::UniformLambertian(UniformLambertian::new(base)),
            _ if smooth_metal => Self::Mirror(SmoothMirror::new(base)),
            BrdfModel::Microfacet => Self::Microfacet(RoughDielectric::new(
                base,
                material.metallic,
                material.roughness,
                material.ior,
            )),
            BrdfModel::Principled => Self::Principled(Principled::new(
                base,
                material.metallic,
                material.roughness,
                material.ior,
            )),
        }
    }

    /// The variant as a trait object.
    #[inline]
    pub fn as_brdf(&self) -> &dyn Brdf {
        match self {
            Self::Lambertian(b) => b,
            Self::UniformLambertian(b) => b,
            Self::Mirror(b) => b,
            Self::Microfacet(b) => b,
            Self::Principled(b) => b,
        }
    }
}

impl Brdf for SurfaceBrdf {
    #[inline]
    fn sample(&self, sampler: &mut dyn Sampler, wi: Vec3, frame: &Frame) -> Vec3 {
        self.as_brdf().sample(sampler, wi, frame)
    }

    #[inline]
    fn evaluate(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> Color {
        self.as_brdf().evaluate(wi, wo, frame)
    }

    #[inline]
    fn pdf(&self, wi: Vec3, wo: Vec3, frame: &Frame) -> f32 {
        self.as_brdf().pdf(wi, wo, frame)
    }

    #[inline]
    fn is_singular(&self) -> bool {
        self.as_brdf().is_singular()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_selection() {
        let diffuse = Material::diffuse("grey", Color::splat(0.5));

        assert!(matches!(
            SurfaceBrdf::from_material(&diffuse, BrdfModel::Lambertian),
            SurfaceBrdf::Lambertian(_)
        ));
        assert!(matches!(
            SurfaceBrdf::from_material(&diffuse, BrdfModel::UniformLambertian),
            SurfaceBrdf::UniformLambertian(_)
        ));
        assert!(matches!(
            SurfaceBrdf::from_material(&diffuse, BrdfModel::Microfacet),
            SurfaceBrdf::Microfacet(_)
        ));
        assert!(matches!(
            SurfaceBrdf::from_material(&diffuse, BrdfModel::default()),
            SurfaceBrdf::Principled(_)
        ));
    }

    #[test]
    fn test_smooth_metal_becomes_mirror() {
        let chrome = Material::metal("chrome", Color::splat(0.9), 0.0);

        let brdf = SurfaceBrdf::from_material(&chrome, BrdfModel::Principled);
        assert!(matches!(brdf, SurfaceBrdf::Mirror(_)));
        assert!(brdf.is_singular());

        let brdf = SurfaceBrdf::from_material(&chrome, BrdfModel::Microfacet);
        assert!(matches!(brdf, SurfaceBrdf::Mirror(_)));

        // The diffuse models ignore specular parameters entirely
        let brdf = SurfaceBrdf::from_material(&chrome, BrdfModel::Lambertian);
        assert!(!brdf.is_singular());

        // Slightly rough metal stays continuous
        let brushed = Material::metal("brushed", Color::splat(0.9), 0.2);
        let brdf = SurfaceBrdf::from_material(&brushed, BrdfModel::Principled);
        assert!(!brdf.is_singular());
    }

    #[test]
    fn test_model_names_deserialize() {
        let model: BrdfModel = serde_json::from_str("\"uniform_lambertian\"").unwrap();
        assert_eq!(model, BrdfModel::UniformLambertian);

        let model: BrdfModel = serde_json::from_str("\"principled\"").unwrap();
        assert_eq!(model, BrdfModel::Principled);
    }
}
