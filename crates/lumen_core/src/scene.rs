//! Scene container: meshes, materials and the objects that pair them.

use std::sync::Arc;

use lumen_math::Aabb;
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};
use crate::material::Material;
use crate::mesh::Mesh;

/// A renderable placement of a mesh with a material.
///
/// Objects are rigid and un-transformed: the mesh is rendered where its
/// vertices are.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Index into `Scene::meshes`
    pub mesh: usize,

    /// Index into `Scene::materials`
    pub material: usize,
}

impl SceneObject {
    pub fn new(mesh: usize, material: usize) -> Self {
        Self { mesh, material }
    }
}

/// A complete scene containing meshes, materials and objects.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Scene name (usually from filename)
    pub name: String,

    /// Shared mesh geometry
    pub meshes: Vec<Arc<Mesh>>,

    /// Materials used in the scene
    pub materials: Vec<Material>,

    /// (mesh, material) pairs that are actually traced
    pub objects: Vec<SceneObject>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a mesh to the scene and return its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.add_shared_mesh(Arc::new(mesh))
    }

    /// Add an already shared mesh and return its index.
    pub fn add_shared_mesh(&mut self, mesh: Arc<Mesh>) -> usize {
        let id = self.meshes.len();
        self.meshes.push(mesh);
        id
    }

    /// Add a material to the scene and return its index.
    pub fn add_material(&mut self, material: Material) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Add an object pairing a mesh with a material and return its index.
    pub fn add_object(&mut self, mesh: usize, material: usize) -> usize {
        let id = self.objects.len();
        self.objects.push(SceneObject::new(mesh, material));
        id
    }

    /// Get a material by index.
    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Get total triangle count across all objects.
    pub fn total_triangle_count(&self) -> usize {
        self.objects
            .iter()
            .filter_map(|o| self.meshes.get(o.mesh))
            .map(|m| m.triangle_count())
            .sum()
    }

    /// World-space bounding box of all objects.
    pub fn world_bounds(&self) -> Aabb {
        self.objects
            .iter()
            .filter_map(|o| self.meshes.get(o.mesh))
            .fold(Aabb::EMPTY, |acc, m| Aabb::surrounding(&acc, &m.bounds))
    }

    /// Check that the scene can be rendered.
    ///
    /// A scene needs at least one mesh and one material, every object must
    /// reference existing entries, and every mesh must have well-formed
    /// triangle indices. A scene without objects is valid and renders as
    /// pure environment.
    pub fn validate(&self) -> SceneResult<()> {
        if self.meshes.is_empty() {
            return Err(SceneError::NoMeshes(self.name.clone()));
        }
        if self.materials.is_empty() {
            return Err(SceneError::NoMaterials(self.name.clone()));
        }

        for mesh in &self.meshes {
            mesh.validate()?;
        }

        for (object, o) in self.objects.iter().enumerate() {
            if o.mesh >= self.meshes.len() {
                return Err(SceneError::InvalidMesh {
                    object,
                    mesh: o.mesh,
                    count: self.meshes.len(),
                });
            }
            if o.material >= self.materials.len() {
                return Err(SceneError::InvalidMaterial {
                    object,
                    material: o.material,
                    count: self.materials.len(),
                });
            }
        }

        Ok(())
    }
}
