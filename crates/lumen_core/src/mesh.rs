//! Triangle mesh representation.
//!
//! Meshes are immutable once handed to a scene; the renderer references them
//! through `Arc<Mesh>` and never copies vertex data. Relocating vertices
//! (same topology, new positions) produces a new mesh via [`Mesh::relocated`].

use bytemuck::{Pod, Zeroable};
use lumen_math::{Aabb, Vec2, Vec3};

use crate::error::{SceneError, SceneResult};

/// Minimum length below which a loaded normal is treated as missing.
const MIN_NORMAL_LENGTH: f32 = 1e-6;

/// A mesh vertex with shading attributes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub texcoord: Vec2,
}

impl Vertex {
    /// Vertex with a position only; normal and tangent are filled in later.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// An indexed triangle mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Mesh name (for diagnostics)
    pub name: String,

    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box of all vertex positions
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from complete vertices and indices.
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let bounds = Self::compute_bounds(&vertices);
        Self {
            name: name.into(),
            vertices,
            indices,
            bounds,
        }
    }

    /// Create a mesh from bare positions, generating normals and tangents.
    pub fn from_positions(name: impl Into<String>, positions: &[Vec3], indices: Vec<u32>) -> Self {
        let vertices = positions.iter().copied().map(Vertex::from_position).collect();
        let mut mesh = Self::new(name, vertices, indices);
        mesh.compute_normals_and_tangents();
        mesh
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(vertices: &[Vertex]) -> Aabb {
        Aabb::from_point_iter(vertices.iter().map(|v| v.position))
    }

    /// Fill in per-face normals and tangents.
    ///
    /// A triangle whose vertices are missing a normal gets its face normal
    /// (counter-clockwise winding). Tangents follow the UV derivatives; when
    /// the UV mapping is degenerate the first edge is used instead.
    pub fn compute_normals_and_tangents(&mut self) {
        let mut degenerate_uvs = 0usize;

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= self.vertices.len() || i1 >= self.vertices.len() || i2 >= self.vertices.len() {
                continue;
            }

            let (v0, v1, v2) = (self.vertices[i0], self.vertices[i1], self.vertices[i2]);
            let e1 = v1.position - v0.position;
            let e2 = v2.position - v0.position;
            let face_normal = e1.cross(e2).normalize_or_zero();

            let duv1 = v1.texcoord - v0.texcoord;
            let duv2 = v2.texcoord - v0.texcoord;
            let det = duv1.x * duv2.y - duv1.y * duv2.x;
            let tangent = if det.abs() > f32::EPSILON {
                ((e1 * duv2.y - e2 * duv1.y) / det).normalize_or_zero()
            } else {
                degenerate_uvs += 1;
                e1.normalize_or_zero()
            };

            let missing_normal = [v0, v1, v2]
                .iter()
                .any(|v| v.normal.length() < MIN_NORMAL_LENGTH);

            for i in [i0, i1, i2] {
                if missing_normal {
                    self.vertices[i].normal = face_normal;
                }
                self.vertices[i].tangent = tangent;
            }
        }

        if degenerate_uvs > 0 {
            log::debug!(
                "Mesh '{}': {} triangles without a usable UV mapping, tangents follow the first edge",
                self.name,
                degenerate_uvs
            );
        }
    }

    /// Copy of this mesh with every position passed through `f`.
    ///
    /// Topology (vertex count, indices) is unchanged, so acceleration
    /// structures built over the original can be refit instead of rebuilt.
    pub fn relocated(&self, f: impl Fn(Vec3) -> Vec3) -> Mesh {
        let vertices = self
            .vertices
            .iter()
            .map(|v| Vertex {
                position: f(v.position),
                ..*v
            })
            .collect();
        Mesh::new(self.name.clone(), vertices, self.indices.clone())
    }

    /// Check that the indices form whole triangles over existing vertices.
    pub fn validate(&self) -> SceneResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(SceneError::MalformedIndices {
                mesh: self.name.clone(),
                len: self.indices.len(),
            });
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(SceneError::IndexOutOfRange {
                mesh: self.name.clone(),
                index,
                vertex_count: self.vertices.len(),
            });
        }
        Ok(())
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The three vertices of triangle `index`.
    ///
    /// Panics on out-of-range indices; scenes are validated before rendering.
    #[inline]
    pub fn triangle_vertices(&self, index: usize) -> [&Vertex; 3] {
        let base = index * 3;
        [
            &self.vertices[self.indices[base] as usize],
            &self.vertices[self.indices[base + 1] as usize],
            &self.vertices[self.indices[base + 2] as usize],
        ]
    }

    /// The three corner positions of triangle `index`.
    #[inline]
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [v0, v1, v2] = self.triangle_vertices(index);
        [v0.position, v1.position, v2.position]
    }

    /// Tight bounding box of triangle `index`.
    pub fn triangle_bounds(&self, index: usize) -> Aabb {
        Aabb::from_point_iter(self.triangle(index))
    }

    /// Get the mesh center (center of bounding box).
    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }
}
