//! Surface extraction from density grids.
//!
//! The pipeline only depends on the [`MeshExtractor`] trait. [`MarchingCubes`]
//! is the bundled implementation.

pub mod marching_cubes;
pub mod tables;

pub use marching_cubes::MarchingCubes;

use glam::Vec3;

use crate::core::{Result, TerrainError};
use crate::generation::grid::DensityGrid;

/// Triangle mesh in chunk-local coordinates.
///
/// `triangles` holds three vertex indices per triangle, wound counter-clockwise
/// when seen from empty space. `normals` has one entry per vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub normals: Vec<Vec3>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Turns a density grid into a triangle mesh.
///
/// `padded` is the density grid one cell larger on each X/Z side, used only
/// for normals so they stay continuous across chunk borders.
pub trait MeshExtractor: Send + Sync {
    fn extract(&self, density: &DensityGrid, padded: &DensityGrid, cube_size: f32) -> Result<MeshData>;
}

/// Error unless `padded` is exactly the padded size of `density`.
pub fn check_padded(density: &DensityGrid, padded: &DensityGrid) -> Result<()> {
    let expected = density.size().padded();
    if padded.size() != expected {
        return Err(TerrainError::GridMismatch {
            expected,
            actual: padded.size(),
        });
    }
    Ok(())
}
