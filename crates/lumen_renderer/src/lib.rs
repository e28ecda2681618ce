//! Lumen Renderer - CPU Monte Carlo path tracing.
//!
//! The core is three cooperating parts:
//!
//! - [`bvh`] / [`accel`]: flat-array BVH and the two-level (per-mesh +
//!   instance) accelerator answering nearest-hit queries
//! - [`brdf`]: reflectance models with importance sampling and one-sample MIS
//! - [`integrator`]: the path tracing loop with Russian roulette
//!
//! plus the [`sampler`] that feeds them, and a thin camera / bucketed render
//! loop on top.
//!
//! # Example
//!
//! ```ignore
//! let integrator = PathTracedIntegrator::new(IntegratorConfig::default(), Arc::new(scene))?;
//! let camera = Camera::look_at(eye, target, Vec3::Y).with_resolution(config.width, config.height);
//! let image = render(&config, &camera, &integrator)?;
//! ```

pub mod accel;
pub mod brdf;
pub mod bucket;
pub mod bvh;
pub mod camera;
pub mod error;
pub mod integrator;
pub mod renderer;
pub mod sampler;

pub use accel::{BuildState, Intersection, MeshBvh, SceneAccel};
pub use brdf::{Brdf, BrdfModel, BrdfSample, Frame, SurfaceBrdf};
pub use bucket::{generate_buckets, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{Bvh, BvhNode, SplitMethod, LEAF_MAX_SIZE};
pub use camera::{Camera, ViewPyramid};
pub use error::{AccelError, RenderError, RenderResult};
pub use integrator::{Environment, Integrator, IntegratorConfig, PathTracedIntegrator};
pub use renderer::{render, render_pixel, ImageBuffer, RenderConfig};
pub use sampler::{RngSampler, Sampler, WhiteNoiseSampler};

/// Re-export math and scene types so callers need only this crate
pub use lumen_core::{Material, Mesh, Scene, SceneError, SceneObject, Vertex};
pub use lumen_math::{Aabb, Color, Ray, Vec3};
