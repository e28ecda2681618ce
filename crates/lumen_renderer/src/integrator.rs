//! Path tracing integrator.
//!
//! [`PathTracedIntegrator`] owns everything `trace` reads: the scene, its
//! two-level accelerator and one BRDF per material. Setup happens in
//! [`PathTracedIntegrator::new`] / [`PathTracedIntegrator::set_scene_data`];
//! afterwards the integrator is immutable and shared by reference across
//! render threads.

use std::sync::Arc;

use lumen_core::{Mesh, Scene};
use lumen_math::{Color, Ray, Vec3};
use serde::{Deserialize, Serialize};

use crate::accel::{Intersection, SceneAccel};
use crate::brdf::{Brdf, BrdfModel, Frame, SurfaceBrdf};
use crate::bvh::SplitMethod;
use crate::error::{RenderError, RenderResult};
use crate::sampler::Sampler;

/// Radiance estimator for a single camera ray.
pub trait Integrator: Send + Sync {
    /// Estimate the radiance arriving along `ray` (one Monte Carlo sample).
    fn trace(&self, ray: &Ray, sampler: &mut dyn Sampler) -> Color;
}

/// Radiance arriving from directions that leave the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Same radiance in every direction
    Constant(Color),
    /// Blend from `horizon` (pointing down) to `zenith` (pointing up)
    Gradient { horizon: Color, zenith: Color },
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Constant(Color::new(0.3, 0.6, 0.9))
    }
}

impl Environment {
    /// Radiance seen along the unit direction `direction`.
    #[inline]
    pub fn radiance(&self, direction: Vec3) -> Color {
        match *self {
            Environment::Constant(color) => color,
            Environment::Gradient { horizon, zenith } => {
                let a = 0.5 * (direction.y.clamp(-1.0, 1.0) + 1.0);
                horizon.lerp(zenith, a)
            }
        }
    }
}

/// Integrator settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Maximum number of scattering events per path. The vertex reached after
    /// the last scattering event still collects emission and environment.
    pub max_bounce_depth: u32,

    /// Terminate low-throughput paths stochastically
    pub russian_roulette: bool,

    /// Reflectance model materials are translated into
    pub brdf_model: BrdfModel,

    pub environment: Environment,

    /// Offset along the new direction for secondary ray origins
    pub ray_epsilon: f32,

    /// Split strategy for the acceleration structure build
    pub split_method: SplitMethod,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            max_bounce_depth: 5,
            russian_roulette: true,
            brdf_model: BrdfModel::default(),
            environment: Environment::default(),
            ray_epsilon: 1e-3,
            split_method: SplitMethod::default(),
        }
    }
}

impl IntegratorConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if !self.ray_epsilon.is_finite() || self.ray_epsilon < 0.0 {
            return Err(RenderError::InvalidConfig(format!(
                "ray_epsilon must be finite and non-negative, got {}",
                self.ray_epsilon
            )));
        }
        Ok(())
    }
}

/// Unidirectional path tracer with BRDF importance sampling and Russian
/// roulette. Emitters are only reached by bounce sampling; there is no
/// explicit light sampling.
#[derive(Debug, Clone)]
pub struct PathTracedIntegrator {
    config: IntegratorConfig,
    scene: Arc<Scene>,
    accel: SceneAccel,
    /// One entry per scene material
    brdfs: Vec<SurfaceBrdf>,
}

/// Interpolated surface attributes at a hit.
struct SurfacePoint {
    position: Vec3,
    normal: Vec3,
    tangent: Vec3,
}

impl PathTracedIntegrator {
    /// Validate the configuration and scene, then build the accelerator and
    /// material tables.
    pub fn new(config: IntegratorConfig, scene: Arc<Scene>) -> RenderResult<Self> {
        config.validate()?;
        let (accel, brdfs) = Self::prepare(&config, &scene)?;
        Ok(Self {
            config,
            scene,
            accel,
            brdfs,
        })
    }

    /// Replace the scene. On error the previous scene stays in place.
    pub fn set_scene_data(&mut self, scene: Arc<Scene>) -> RenderResult<()> {
        let (accel, brdfs) = Self::prepare(&self.config, &scene)?;
        self.scene = scene;
        self.accel = accel;
        self.brdfs = brdfs;
        Ok(())
    }

    /// Move the vertices of mesh `index` (same topology), refitting the
    /// accelerator instead of rebuilding it.
    pub fn update_mesh(&mut self, index: usize, mesh: Arc<Mesh>) -> RenderResult<()> {
        self.accel.update_mesh(index, mesh)?;
        Ok(())
    }

    fn prepare(config: &IntegratorConfig, scene: &Scene) -> RenderResult<(SceneAccel, Vec<SurfaceBrdf>)> {
        scene.validate()?;

        let mut accel = SceneAccel::new(config.split_method);
        accel.build(scene)?;

        let brdfs = scene
            .materials
            .iter()
            .map(|m| SurfaceBrdf::from_material(m, config.brdf_model))
            .collect();

        Ok((accel, brdfs))
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    pub fn accel(&self) -> &SceneAccel {
        &self.accel
    }

    /// Position, shading normal and tangent at a hit, from the triangle's
    /// three indexed vertices weighted `(1 - u - v, u, v)`.
    fn surface_point(mesh: &Mesh, hit: &Intersection) -> SurfacePoint {
        let [v0, v1, v2] = mesh.triangle_vertices(hit.primitive as usize);
        let w = 1.0 - hit.u - hit.v;

        let position = v0.position * w + v1.position * hit.u + v2.position * hit.v;

        let geometric = (v1.position - v0.position)
            .cross(v2.position - v0.position)
            .normalize_or_zero();
        let normal = (v0.normal * w + v1.normal * hit.u + v2.normal * hit.v).normalize_or_zero();
        let normal = if normal == Vec3::ZERO { geometric } else { normal };

        let tangent = v0.tangent * w + v1.tangent * hit.u + v2.tangent * hit.v;

        SurfacePoint {
            position,
            normal,
            tangent,
        }
    }
}

impl Integrator for PathTracedIntegrator {
    fn trace(&self, ray: &Ray, sampler: &mut dyn Sampler) -> Color {
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut ray = *ray;

        for bounce in 0..=self.config.max_bounce_depth {
            let hit = self.accel.intersect(&ray, 0.0, f32::INFINITY);
            if !hit.is_hit() {
                radiance += throughput * self.config.environment.radiance(ray.direction);
                break;
            }

            // Instances and meshes were validated at setup
            let Some(object) = self.accel.object(hit.instance) else {
                break;
            };
            let Some(mesh) = self.accel.mesh(object.mesh) else {
                break;
            };
            let material = &self.scene.materials[object.material];

            radiance += throughput * material.emission;
            if bounce == self.config.max_bounce_depth {
                break;
            }

            let surface = Self::surface_point(mesh, &hit);
            let (normal, tangent) = if ray.direction.dot(surface.normal) > 0.0 {
                (-surface.normal, -surface.tangent)
            } else {
                (surface.normal, surface.tangent)
            };
            let frame = Frame::from_normal_tangent(normal, tangent);

            let brdf = &self.brdfs[object.material];
            let Some(scatter) = brdf.sample_contribution(sampler, -ray.direction, &frame) else {
                break;
            };

            throughput *= scatter.weight;
            ray = Ray::new(
                surface.position + scatter.wo * self.config.ray_epsilon,
                scatter.wo,
            );

            if self.config.russian_roulette {
                let survival = throughput.max_element().clamp(0.0, 1.0);
                if sampler.sample() >= survival {
                    break;
                }
                throughput /= survival;
            }
        }

        radiance
    }
}
