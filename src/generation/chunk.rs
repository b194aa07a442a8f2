//! Per-chunk request and intermediate data.

use std::fmt;

use glam::Vec3;

use crate::core::{Result, TerrainError};
use crate::generation::grid::{GridSize, HeightMap, NoiseVolume};
use crate::terrain::{HeightCurve, NoiseSampler, NoiseSettings};

/// Identifier assigned to a chunk when it is requested
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Generation progress of one chunk. Stages only ever move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChunkStage {
    Requested,
    NoiseReady,
    DensityReady,
    MeshReady,
    Materialized,
}

impl ChunkStage {
    /// The stage that follows this one, if any
    pub fn next(self) -> Option<ChunkStage> {
        match self {
            ChunkStage::Requested => Some(ChunkStage::NoiseReady),
            ChunkStage::NoiseReady => Some(ChunkStage::DensityReady),
            ChunkStage::DensityReady => Some(ChunkStage::MeshReady),
            ChunkStage::MeshReady => Some(ChunkStage::Materialized),
            ChunkStage::Materialized => None,
        }
    }
}

/// Everything needed to generate one chunk.
///
/// Owns its noise settings and height curve, so later edits to the caller's
/// copies never reach a generation already in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRequest {
    /// World-space center of the chunk
    pub position: Vec3,
    /// World-space extent of the chunk
    pub dimensions: Vec3,
    /// Native grid size (samples per axis)
    pub grid_size: GridSize,
    /// World units per grid cell
    pub cube_size: f32,
    /// Minimum blended noise for a cell to become solid
    pub surface_threshold: f32,
    pub noise: NoiseSettings,
    pub height_curve: HeightCurve,
    pub height_multiplier: f32,
}

impl ChunkRequest {
    /// Reject requests the pipeline cannot generate.
    pub fn validate(&self) -> Result<()> {
        self.grid_size.validate()?;
        validate_cube_size(self.cube_size)
    }

    /// Grid size of the normal-computation grid
    pub fn padded_grid_size(&self) -> GridSize {
        self.grid_size.padded()
    }
}

pub(crate) fn validate_cube_size(cube_size: f32) -> Result<()> {
    if !cube_size.is_finite() || cube_size <= 0.0 {
        return Err(TerrainError::InvalidCubeSize(cube_size));
    }
    Ok(())
}

/// Raw noise for one grid resolution
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkData {
    pub height_map: HeightMap,
    pub density_noise: NoiseVolume,
}

impl ChunkData {
    /// Sample both noise grids for `size` around `position`.
    pub fn sample(
        sampler: &dyn NoiseSampler,
        size: GridSize,
        cube_size: f32,
        position: Vec3,
        settings: &NoiseSettings,
    ) -> Self {
        Self {
            height_map: sampler.height_noise(size.x, size.z, cube_size, position, settings),
            density_noise: sampler.density_noise(size, cube_size, position, settings),
        }
    }

    /// Error unless both grids match `size`.
    pub fn check_size(&self, size: GridSize) -> Result<()> {
        let actual = self.density_noise.size();
        let height_ok = self.height_map.width() == size.x && self.height_map.depth() == size.z;
        if actual != size || !height_ok {
            return Err(TerrainError::GridMismatch {
                expected: size,
                actual: if actual != size {
                    actual
                } else {
                    GridSize::new(self.height_map.width(), size.y, self.height_map.depth())
                },
            });
        }
        Ok(())
    }
}

/// A request together with the noise sampled for it, native and padded.
#[derive(Clone, Debug)]
pub struct ChunkGenerationData {
    pub id: ChunkId,
    pub request: ChunkRequest,
    pub chunk_data: ChunkData,
    pub padded_data: ChunkData,
}

impl ChunkGenerationData {
    /// Run the noise stage for `request`.
    pub fn generate(id: ChunkId, request: ChunkRequest, sampler: &dyn NoiseSampler) -> Self {
        let chunk_data = ChunkData::sample(
            sampler,
            request.grid_size,
            request.cube_size,
            request.position,
            &request.noise,
        );
        let padded_data = ChunkData::sample(
            sampler,
            request.padded_grid_size(),
            request.cube_size,
            request.position,
            &request.noise,
        );
        Self {
            id,
            request,
            chunk_data,
            padded_data,
        }
    }
}
