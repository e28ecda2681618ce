//! Renderer error types.

use lumen_core::SceneError;
use thiserror::Error;

/// Acceleration structure lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccelError {
    #[error("no geometry to build an acceleration structure from")]
    NoGeometry,

    #[error("acceleration structure has not been built")]
    NotBuilt,

    #[error("triangle count changed from {built} to {current}; rebuild instead of update")]
    TopologyChanged { built: usize, current: usize },

    #[error("mesh index {index} out of range ({count} meshes)")]
    MeshIndex { index: usize, count: usize },

    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] SceneError),
}

/// Errors surfaced while setting up a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("acceleration structure error: {0}")]
    Accel(#[from] AccelError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for renderer setup.
pub type RenderResult<T> = Result<T, RenderError>;
