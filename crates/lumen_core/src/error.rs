//! Scene validation errors.

use thiserror::Error;

/// Problems that make a scene unrenderable.
///
/// These are reported before any ray is traced; the renderer rejects the whole
/// scene rather than skipping the offending data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene '{0}' has no meshes")]
    NoMeshes(String),

    #[error("scene '{0}' has no materials")]
    NoMaterials(String),

    #[error("object {object} references mesh {mesh}, but the scene only has {count} meshes")]
    InvalidMesh {
        object: usize,
        mesh: usize,
        count: usize,
    },

    #[error("object {object} references material {material}, but the scene only has {count} materials")]
    InvalidMaterial {
        object: usize,
        material: usize,
        count: usize,
    },

    #[error("mesh '{mesh}' has {len} indices, which is not a multiple of 3")]
    MalformedIndices { mesh: String, len: usize },

    #[error("mesh '{mesh}' references vertex {index}, but only has {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
