//! Level layout: how chunks tile the level and where each one sits in the world.

use glam::{UVec2, Vec2, Vec3};

use crate::core::{Result, TerrainError};
use crate::generation::grid::GridSize;

/// Most grid cells one chunk may span along an axis
pub const MAX_AXIS_CELLS: usize = 4096;

/// Grid samples along one axis of a chunk `extent` world units long.
///
/// Rejects extents that are not finite and positive, or that would span more
/// than [`MAX_AXIS_CELLS`] cells.
pub fn axis_samples(extent: f32, cube_size: f32) -> Result<usize> {
    if !cube_size.is_finite() || cube_size <= 0.0 {
        return Err(TerrainError::InvalidCubeSize(cube_size));
    }
    if !extent.is_finite() || extent <= 0.0 {
        return Err(TerrainError::InvalidChunkSize(extent));
    }
    let cells = (extent / cube_size).round();
    if cells > MAX_AXIS_CELLS as f32 {
        return Err(TerrainError::InvalidChunkSize(extent));
    }
    Ok(cells as usize + 1)
}

/// Infallible form of [`axis_samples`] for already validated extents.
fn clamped_samples(extent: f32, cube_size: f32) -> usize {
    let cells = (extent / cube_size).round();
    if cells.is_nan() {
        return 1;
    }
    cells.clamp(0.0, MAX_AXIS_CELLS as f32) as usize + 1
}

/// Grid of chunks centered on the world origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelLayout {
    /// Number of chunks along X and Z
    pub level_size: UVec2,
    /// World-space extent of one chunk along X and Z
    pub chunk_size: Vec2,
    /// World units per grid cell
    pub cube_size: f32,
}

impl LevelLayout {
    pub fn new(level_size: UVec2, chunk_size: Vec2, cube_size: f32) -> Result<Self> {
        let width = axis_samples(chunk_size.x, cube_size)?;
        let depth = axis_samples(chunk_size.y, cube_size)?;
        if level_size.x == 0 || level_size.y == 0 {
            return Err(TerrainError::InvalidGridSize {
                x: level_size.x as usize * width,
                y: 1,
                z: level_size.y as usize * depth,
            });
        }
        Ok(Self {
            level_size,
            chunk_size,
            cube_size,
        })
    }

    /// Grid samples per chunk along X and Z. Neighbouring chunks share their border samples.
    pub fn grid_columns(&self) -> (usize, usize) {
        (
            clamped_samples(self.chunk_size.x, self.cube_size),
            clamped_samples(self.chunk_size.y, self.cube_size),
        )
    }

    /// Native grid size for a chunk with `height` samples along Y
    pub fn grid_size(&self, height: usize) -> GridSize {
        let (width, depth) = self.grid_columns();
        GridSize::new(width, height, depth)
    }

    /// World-space extent of the whole level along X and Z
    pub fn extent(&self) -> Vec2 {
        Vec2::new(
            self.level_size.x as f32 * self.chunk_size.x,
            self.level_size.y as f32 * self.chunk_size.y,
        )
    }

    /// Center of chunk `(i, j)`; the level itself is centered on the origin.
    pub fn chunk_position(&self, i: u32, j: u32) -> Vec3 {
        let half = self.extent() * 0.5;
        Vec3::new(
            (i as f32 + 0.5) * self.chunk_size.x - half.x,
            0.0,
            (j as f32 + 0.5) * self.chunk_size.y - half.y,
        )
    }

    /// Every chunk index in the level, row by row.
    pub fn chunks(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.level_size.y).flat_map(move |j| (0..self.level_size.x).map(move |i| (i, j)))
    }

    pub fn chunk_count(&self) -> usize {
        self.level_size.x as usize * self.level_size.y as usize
    }
}
