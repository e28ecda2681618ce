//! Lumen Core - scene data for the Lumen path tracer.
//!
//! This crate provides the read-only scene representation consumed by the
//! renderer:
//!
//! - **Geometry**: `Vertex`, `Mesh` (indexed triangles)
//! - **Shading**: `Material` (base color, emission, metallic, roughness, IOR)
//! - **Scene**: meshes + materials + `SceneObject` (mesh, material) pairs
//!
//! Loading scenes from files is left to callers; scenes are assembled with
//! the builder methods on [`Scene`] and checked with [`Scene::validate`].
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{Material, Mesh, Scene};
//!
//! let mut scene = Scene::new("quad");
//! let mesh = scene.add_mesh(Mesh::from_positions("quad", positions, indices));
//! let material = scene.add_material(Material::diffuse("grey", Color::splat(0.5)));
//! scene.add_object(mesh, material);
//! scene.validate()?;
//! ```

pub mod error;
pub mod material;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use error::SceneError;
pub use material::Material;
pub use mesh::{Mesh, Vertex};
pub use scene::{Scene, SceneObject};
