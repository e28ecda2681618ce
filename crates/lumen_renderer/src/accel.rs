//! Two-level ray acceleration: one triangle BVH per mesh (bottom level) and
//! a BVH over object instances (top level).
//!
//! Objects are rigid, un-transformed placements of a mesh, so an instance's
//! box is its mesh's box and rays need no per-instance transform.

use std::sync::Arc;
use std::time::Instant;

use lumen_core::{Mesh, Scene, SceneObject};
use lumen_math::{Aabb, Ray, Vec3};

use crate::bvh::{Bvh, SplitMethod};
use crate::error::AccelError;

/// Determinants smaller than this mean the ray is parallel to the triangle.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Result of a nearest-hit query.
///
/// `u` and `v` are the barycentric weights of the triangle's second and third
/// vertex; the first vertex has weight `1 - u - v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub primitive: u32,
    pub instance: u32,
}

impl Intersection {
    pub const INVALID_PRIMITIVE: u32 = u32::MAX;
    pub const INVALID_INSTANCE: u32 = u32::MAX;

    /// The miss sentinel: `t = t_max`, no primitive.
    pub fn miss(t_max: f32) -> Self {
        Self {
            t: t_max,
            u: 0.0,
            v: 0.0,
            primitive: Self::INVALID_PRIMITIVE,
            instance: Self::INVALID_INSTANCE,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.primitive != Self::INVALID_PRIMITIVE
    }
}

/// Möller-Trumbore ray/triangle test.
///
/// Returns `(t, u, v)` for a hit with `t_min <= t <= t_max`. Rays parallel to
/// the triangle plane miss. Both faces are hit.
#[inline]
pub fn intersect_triangle(ray: &Ray, [v0, v1, v2]: [Vec3; 3], t_min: f32, t_max: f32) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    (t >= t_min && t <= t_max).then_some((t, u, v))
}

/// Lifecycle of a bottom-level structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// No tree yet; every query misses
    Empty,
    /// Built from scratch over the current geometry
    Built,
    /// Refit at least once since the last build
    Updated,
}

/// Bottom-level BVH over the triangles of one mesh.
#[derive(Debug, Clone)]
pub struct MeshBvh {
    /// Geometry the current tree was built or refit over
    mesh: Option<Arc<Mesh>>,
    /// Geometry staged by `set_geometry`, not yet visible to queries
    pending: Option<Arc<Mesh>>,
    bvh: Bvh,
    split_method: SplitMethod,
    built_triangles: usize,
    state: BuildState,
}

impl MeshBvh {
    pub fn new(split_method: SplitMethod) -> Self {
        Self {
            mesh: None,
            pending: None,
            bvh: Bvh::default(),
            split_method,
            built_triangles: 0,
            state: BuildState::Empty,
        }
    }

    /// Convenience: set geometry and build.
    pub fn from_mesh(mesh: Arc<Mesh>, split_method: SplitMethod) -> Result<Self, AccelError> {
        let mut bvh = Self::new(split_method);
        bvh.set_geometry(mesh);
        bvh.build()?;
        Ok(bvh)
    }

    /// Attach (or replace) the geometry. Takes effect on the next
    /// [`build`](Self::build) or [`update`](Self::update); until then queries
    /// keep using the geometry the tree was made for.
    pub fn set_geometry(&mut self, mesh: Arc<Mesh>) {
        self.pending = Some(mesh);
    }

    /// Build the tree from scratch.
    pub fn build(&mut self) -> Result<(), AccelError> {
        let mesh = Arc::clone(self.staged().ok_or(AccelError::NoGeometry)?);
        mesh.validate()?;

        let start = Instant::now();
        let bounds = triangle_bounds(&mesh);
        self.bvh = Bvh::build(&bounds, self.split_method);
        self.built_triangles = bounds.len();
        self.state = BuildState::Built;

        log::debug!(
            "Built BVH for mesh '{}': {} triangles, {} nodes, depth {} in {:.2?}",
            mesh.name,
            bounds.len(),
            self.bvh.node_count(),
            self.bvh.depth(),
            start.elapsed()
        );
        self.mesh = Some(mesh);
        self.pending = None;
        Ok(())
    }

    /// Refit the tree to the current geometry without restructuring.
    ///
    /// The geometry must have the same triangle count as at build time;
    /// otherwise rebuild.
    pub fn update(&mut self) -> Result<(), AccelError> {
        if self.state == BuildState::Empty {
            return Err(AccelError::NotBuilt);
        }
        let mesh = Arc::clone(self.staged().ok_or(AccelError::NoGeometry)?);
        mesh.validate()?;
        if mesh.triangle_count() != self.built_triangles {
            return Err(AccelError::TopologyChanged {
                built: self.built_triangles,
                current: mesh.triangle_count(),
            });
        }

        self.bvh.refit(&triangle_bounds(&mesh));
        self.state = BuildState::Updated;
        self.mesh = Some(mesh);
        self.pending = None;
        Ok(())
    }

    fn staged(&self) -> Option<&Arc<Mesh>> {
        self.pending.as_ref().or(self.mesh.as_ref())
    }

    /// Nearest triangle hit in `[t_min, t_max]`. `instance` is left invalid.
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Intersection {
        let mut hit = Intersection::miss(t_max);
        let Some(mesh) = self.mesh.as_deref() else {
            return hit;
        };
        if self.state == BuildState::Empty {
            return hit;
        }

        self.bvh.traverse(ray, t_min, t_max, |prim, closest| {
            let (t, u, v) = intersect_triangle(ray, mesh.triangle(prim as usize), t_min, closest)?;
            hit = Intersection {
                t,
                u,
                v,
                primitive: prim,
                instance: Intersection::INVALID_INSTANCE,
            };
            Some(t)
        });

        hit
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Geometry the current tree answers queries for.
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }
}

fn triangle_bounds(mesh: &Mesh) -> Vec<Aabb> {
    (0..mesh.triangle_count()).map(|i| mesh.triangle_bounds(i)).collect()
}

/// Two-level accelerator over a whole scene.
///
/// Instance `i` is scene object `i`.
#[derive(Debug, Clone)]
pub struct SceneAccel {
    meshes: Vec<MeshBvh>,
    objects: Vec<SceneObject>,
    top: Bvh,
    split_method: SplitMethod,
    built: bool,
}

impl SceneAccel {
    pub fn new(split_method: SplitMethod) -> Self {
        Self {
            meshes: Vec::new(),
            objects: Vec::new(),
            top: Bvh::default(),
            split_method,
            built: false,
        }
    }

    /// Build every bottom-level tree and the top-level tree.
    ///
    /// Objects referencing missing meshes are reported as
    /// [`AccelError::MeshIndex`]. On error the previous build is kept.
    pub fn build(&mut self, scene: &Scene) -> Result<(), AccelError> {
        if scene.meshes.is_empty() {
            return Err(AccelError::NoGeometry);
        }
        if let Some(bad) = scene.objects.iter().find(|o| o.mesh >= scene.meshes.len()) {
            return Err(AccelError::MeshIndex {
                index: bad.mesh,
                count: scene.meshes.len(),
            });
        }

        let start = Instant::now();
        let meshes = scene
            .meshes
            .iter()
            .map(|mesh| MeshBvh::from_mesh(Arc::clone(mesh), self.split_method))
            .collect::<Result<Vec<_>, _>>()?;
        let bounds = instance_bounds(&meshes, &scene.objects);
        let top = Bvh::build(&bounds, self.split_method);

        self.meshes = meshes;
        self.objects = scene.objects.clone();
        self.top = top;
        self.built = true;

        log::info!(
            "Scene '{}': {} meshes, {} instances, {} triangles, top-level {} nodes, built in {:.2?}",
            scene.name,
            self.meshes.len(),
            self.objects.len(),
            scene.total_triangle_count(),
            self.top.node_count(),
            start.elapsed()
        );
        Ok(())
    }

    /// Replace the geometry of mesh `index` with a same-topology mesh,
    /// refitting its tree and the top level.
    pub fn update_mesh(&mut self, index: usize, mesh: Arc<Mesh>) -> Result<(), AccelError> {
        if !self.built {
            return Err(AccelError::NotBuilt);
        }
        let count = self.meshes.len();
        let blas = self
            .meshes
            .get_mut(index)
            .ok_or(AccelError::MeshIndex { index, count })?;

        // Validate before touching the stored geometry
        mesh.validate()?;
        if mesh.triangle_count() != blas.built_triangles {
            return Err(AccelError::TopologyChanged {
                built: blas.built_triangles,
                current: mesh.triangle_count(),
            });
        }
        blas.set_geometry(mesh);
        blas.update()?;

        let bounds = instance_bounds(&self.meshes, &self.objects);
        self.top.refit(&bounds);
        Ok(())
    }

    /// Nearest hit across all instances; fills in `instance`.
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Intersection {
        let mut best = Intersection::miss(t_max);

        self.top.traverse(ray, t_min, t_max, |instance, closest| {
            let object = &self.objects[instance as usize];
            let hit = self.meshes[object.mesh].intersect(ray, t_min, closest);
            if !hit.is_hit() {
                return None;
            }
            best = Intersection { instance, ..hit };
            Some(hit.t)
        });

        best
    }

    /// The object placed at `instance`.
    pub fn object(&self, instance: u32) -> Option<&SceneObject> {
        self.objects.get(instance as usize)
    }

    /// Current geometry of mesh `index` (reflects [`update_mesh`](Self::update_mesh)).
    pub fn mesh(&self, index: usize) -> Option<&Arc<Mesh>> {
        self.meshes.get(index).and_then(MeshBvh::mesh)
    }

    pub fn bounds(&self) -> Aabb {
        self.top.bounds()
    }

    pub fn instance_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }
}

fn instance_bounds(meshes: &[MeshBvh], objects: &[SceneObject]) -> Vec<Aabb> {
    objects.iter().map(|o| meshes[o.mesh].bounds()).collect()
}
