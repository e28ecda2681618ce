//! Image rendering: per-pixel sampling and the parallel bucket loop.

use std::path::Path;
use std::time::Instant;

use lumen_math::Color;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::{Camera, ViewPyramid};
use crate::error::{RenderError, RenderResult};
use crate::integrator::{Integrator, IntegratorConfig};
use crate::sampler::{Sampler, WhiteNoiseSampler};

/// Display gamma applied by [`ImageBuffer::to_rgba8`].
pub const DISPLAY_GAMMA: f32 = 2.2;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel, averaged
    pub samples_per_pixel: u32,
    /// Mixed into every pixel's sampler seed; change it to get a new noise
    /// pattern for the same image
    pub frame_seed: u32,
    pub bucket_size: u32,
    pub integrator: IntegratorConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            samples_per_pixel: 16,
            frame_seed: 0x1234,
            bucket_size: DEFAULT_BUCKET_SIZE,
            integrator: IntegratorConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Parse and validate a JSON configuration. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RenderError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidConfig(
                "samples_per_pixel must be at least 1".into(),
            ));
        }
        if self.bucket_size == 0 {
            return Err(RenderError::InvalidConfig("bucket_size must be at least 1".into()));
        }
        self.integrator.validate()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Apply display gamma.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.powf(1.0 / DISPLAY_GAMMA)
    } else {
        0.0
    }
}

/// Convert a linear color to gamma-encoded 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let encode = |c: f32| (255.99 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [encode(color.x), encode(color.y), encode(color.z), 255]
}

/// Linear radiance image, row-major from the top-left pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (row, line) in result.pixels.chunks_exact(bucket.width as usize).enumerate() {
            let start = ((bucket.y + row as u32) * self.width + bucket.x) as usize;
            self.pixels[start..start + line.len()].copy_from_slice(line);
        }
    }

    /// Gamma-encoded RGBA bytes for display or saving.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&c| color_to_rgba(c)).collect()
    }

    /// Mean radiance over all pixels.
    pub fn average(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().copied().sum::<Color>() / self.pixels.len() as f32
    }
}

/// Render one pixel: jittered primary rays through the pixel footprint,
/// averaged. The pixel owns its sampler, so results do not depend on which
/// thread renders it.
pub fn render_pixel(
    view: &ViewPyramid,
    integrator: &dyn Integrator,
    x: u32,
    y: u32,
    config: &RenderConfig,
) -> Color {
    let mut sampler = WhiteNoiseSampler::for_pixel(x, y, config.width, config.frame_seed);
    let mut pixel_color = Color::ZERO;

    for _ in 0..config.samples_per_pixel {
        let jitter = sampler.sample_2d();
        let u = (x as f32 + jitter.x) / config.width as f32;
        let v = (y as f32 + jitter.y) / config.height as f32;
        pixel_color += integrator.trace(&view.ray(u, v), &mut sampler);
    }

    pixel_color / config.samples_per_pixel as f32
}

/// Render the whole image, buckets in parallel.
pub fn render(
    config: &RenderConfig,
    camera: &Camera,
    integrator: &dyn Integrator,
) -> RenderResult<ImageBuffer> {
    config.validate()?;

    let start = Instant::now();
    let view = camera.view_pyramid();
    let buckets = generate_buckets(config.width, config.height, config.bucket_size);
    log::info!(
        "Rendering {}x{} at {} spp in {} buckets",
        config.width,
        config.height,
        config.samples_per_pixel,
        buckets.len()
    );

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| BucketResult::new(*bucket, render_bucket(bucket, &view, integrator, config)))
        .collect();

    let mut image = ImageBuffer::new(config.width, config.height);
    for result in &results {
        image.write_bucket(result);
    }

    let elapsed = start.elapsed();
    let rays = u64::from(config.width) * u64::from(config.height) * u64::from(config.samples_per_pixel);
    log::info!(
        "Render complete in {:.2?} ({:.2} M camera rays/s)",
        elapsed,
        rays as f64 / elapsed.as_secs_f64().max(1e-9) / 1e6
    );

    Ok(image)
}
