//! Surface material parameters.

use lumen_math::{Color, Vec3};
use serde::{Deserialize, Serialize};

/// A physically based material description.
///
/// The renderer turns these parameters into a reflectance model; the struct
/// itself carries no behavior and is read-only during rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name (for diagnostics)
    pub name: String,

    /// Albedo for dielectrics, reflectance for metals (RGB, 0-1)
    pub base_color: Color,

    /// Emitted radiance (RGB, for light-emitting surfaces)
    pub emission: Color,

    /// Metallic factor (0=dielectric, 1=metal)
    pub metallic: f32,

    /// Roughness factor (0=smooth, 1=rough)
    pub roughness: f32,

    /// Index of refraction, drives Fresnel reflectance at normal incidence
    pub ior: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Material".to_string(),
            base_color: Color::new(0.5, 0.5, 0.5), // Grey default
            emission: Color::ZERO,
            metallic: 0.0,
            roughness: 0.5,
            ior: 1.5,
        }
    }
}

impl Material {
    /// Create a fully rough dielectric with the given color.
    pub fn diffuse(name: impl Into<String>, base_color: Color) -> Self {
        Self {
            name: name.into(),
            base_color,
            roughness: 1.0,
            ..Default::default()
        }
    }

    /// Create a metal with the given reflectance and roughness.
    pub fn metal(name: impl Into<String>, base_color: Color, roughness: f32) -> Self {
        Self {
            name: name.into(),
            base_color,
            metallic: 1.0,
            roughness: roughness.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    /// Create a black emitter.
    pub fn emissive(name: impl Into<String>, emission: Color) -> Self {
        Self {
            name: name.into(),
            base_color: Color::ZERO,
            emission,
            roughness: 1.0,
            ..Default::default()
        }
    }

    /// Builder method to set emission.
    pub fn with_emission(mut self, emission: Color) -> Self {
        self.emission = emission;
        self
    }

    /// Builder method to set the index of refraction.
    pub fn with_ior(mut self, ior: f32) -> Self {
        self.ior = ior;
        self
    }

    /// Check if this material emits light.
    pub fn is_emissive(&self) -> bool {
        self.emission.cmpgt(Vec3::ZERO).any()
    }
}
