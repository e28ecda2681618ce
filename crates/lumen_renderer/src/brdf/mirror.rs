//! Perfect specular reflection.

use lumen_math::{Color, Vec3};

use super::{reflect, Brdf, Frame};
use crate::sampler::Sampler;

/// Ideal mirror. The lobe is a Dirac delta, so `evaluate` returns the
/// reflectance directly and the pdf is a placeholder of 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothMirror {
    pub base_color: Color,
}

impl SmoothMirror {
    pub fn new(base_color: Color) -> Self {
        Self { base_color }
    }
}

impl Brdf for SmoothMirror {
    fn sample(&self, _sampler: &mut dyn Sampler, wi: Vec3, frame: &Frame) -> Vec3 {
        reflect(-wi, frame.normal)
    }

    fn evaluate(&self, _wi: Vec3, _wo: Vec3, _frame: &Frame) -> Color {
        self.base_color
    }

    fn pdf(&self, _wi: Vec3, _wo: Vec3, _frame: &Frame) -> f32 {
        1.0
    }

    fn is_singular(&self) -> bool {
        true
    }
}
